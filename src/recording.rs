use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::landmarks::SourceFrame;
use crate::model_store::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub t_ms: u64,
    #[serde(flatten)]
    pub frame: SourceFrame,
}

/// Reads every valid frame. Malformed lines are skipped the same way the
/// pipeline drops malformed frames.
pub fn read_frames<R: BufRead>(reader: R) -> Result<Vec<RecordedFrame>, StoreError> {
    let mut frames = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<RecordedFrame>(line) {
            Ok(frame) => frames.push(frame),
            Err(e) => debug!(line = number + 1, error = %e, "skipping malformed frame"),
        }
    }
    Ok(frames)
}

pub fn write_frames<'a, W, I>(mut writer: W, frames: I) -> Result<usize, StoreError>
where
    W: Write,
    I: IntoIterator<Item = &'a RecordedFrame>,
{
    let mut written = 0;
    for frame in frames {
        serde_json::to_writer(&mut writer, frame)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{LandmarkFrame, MotionSample, Point3};

    #[test]
    fn test_write_then_read() {
        let frames = vec![
            RecordedFrame {
                t_ms: 0,
                frame: SourceFrame::Landmarks(
                    LandmarkFrame::new(vec![Point3::new(0.5, 0.5, 0.0); 21]).unwrap(),
                ),
            },
            RecordedFrame {
                t_ms: 33,
                frame: SourceFrame::Motion(MotionSample {
                    x: 0.4,
                    y: 0.5,
                    intensity: 0.8,
                    timestamp_ms: 33,
                }),
            },
        ];
        let mut buf = Vec::new();
        assert_eq!(write_frames(&mut buf, &frames).unwrap(), 2);
        assert_eq!(read_frames(buf.as_slice()).unwrap(), frames);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let input = concat!(
            "# recorded by hand\n",
            "{\"t_ms\":0,\"kind\":\"motion\",\"x\":0.1,\"y\":0.2,\"intensity\":0.5,\"timestamp_ms\":0}\n",
            "not json\n",
            "{\"t_ms\":10,\"kind\":\"landmarks\",\"points\":[]}\n",
            "\n",
            "{\"t_ms\":20,\"kind\":\"motion\",\"x\":0.2,\"y\":0.2,\"intensity\":0.5,\"timestamp_ms\":20}\n",
        );
        let frames = read_frames(input.as_bytes()).unwrap();
        let times: Vec<u64> = frames.iter().map(|f| f.t_ms).collect();
        assert_eq!(times, vec![0, 20]);
    }
}
