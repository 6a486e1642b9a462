use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::features::FeatureVector;
use crate::landmarks::Producer;
use crate::model_store::StoreError;
use crate::training::{GestureSample, TrainingSet};

/// Database of collected gesture samples
#[derive(Debug)]
pub struct SampleDb {
    conn: Connection,
}

impl SampleDb {
    /// Open (creating if needed) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS gesture_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                producer TEXT NOT NULL,
                label TEXT NOT NULL,
                features TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_gesture_samples_producer ON gesture_samples(producer, label)",
            [],
        )?;

        Ok(SampleDb { conn })
    }

    /// Store a batch of samples in one transaction
    pub fn insert_samples<'a, I>(
        &mut self,
        producer: Producer,
        samples: I,
    ) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'a GestureSample>,
    {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for sample in samples {
            tx.execute(
                r#"
                INSERT INTO gesture_samples (producer, label, features, timestamp)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    producer.to_string(),
                    sample.label,
                    serde_json::to_string(&sample.features)?,
                    sample.timestamp.to_rfc3339(),
                ],
            )?;
            inserted += 1;
        }
        tx.commit()?;
        debug!(%producer, inserted, "samples stored");
        Ok(inserted)
    }

    /// Every stored sample for `producer`, oldest first
    pub fn load_training_set(&self, producer: Producer) -> Result<TrainingSet, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT label, features, timestamp
            FROM gesture_samples
            WHERE producer = ?1
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([producer.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut set = TrainingSet::new();
        for row in rows {
            let (label, features, timestamp) = row?;
            set.add(GestureSample {
                features: serde_json::from_str(&features)?,
                label,
                timestamp: parse_timestamp(&timestamp)?,
            });
        }
        Ok(set)
    }

    pub fn count_by_label(
        &self,
        producer: Producer,
    ) -> Result<BTreeMap<String, usize>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT label, COUNT(*) FROM gesture_samples WHERE producer = ?1 GROUP BY label",
        )?;
        let rows = stmt.query_map([producer.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (label, count) = row?;
            counts.insert(label, count.max(0) as usize);
        }
        Ok(counts)
    }

    /// Delete every stored sample for `producer`
    pub fn clear(&self, producer: Producer) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM gesture_samples WHERE producer = ?1",
            [producer.to_string()],
        )?;
        info!(%producer, removed, "samples cleared");
        Ok(removed)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Local>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Local))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{raw}': {e}")))
}

/// Writes `label,timestamp,f0,f1,...` rows. Returns the number of samples.
pub fn export_csv<W: Write>(set: &TrainingSet, writer: W) -> Result<usize, StoreError> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    let width = set.all_samples().map(|s| s.features.len()).max().unwrap_or(0);
    let mut header = vec!["label".to_string(), "timestamp".to_string()];
    header.extend((0..width).map(|i| format!("f{i}")));
    wtr.write_record(&header)?;

    let mut written = 0;
    for sample in set.all_samples() {
        let mut record = vec![sample.label.clone(), sample.timestamp.to_rfc3339()];
        record.extend(sample.features.as_slice().iter().map(f32::to_string));
        wtr.write_record(&record)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

/// Reads rows written by [`export_csv`].
pub fn import_csv<R: Read>(reader: R) -> Result<TrainingSet, StoreError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut set = TrainingSet::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let (Some(label), Some(timestamp)) = (record.get(0), record.get(1)) else {
            return Err(StoreError::Corrupt(format!("row {}: missing columns", line + 1)));
        };
        let features = record
            .iter()
            .skip(2)
            .map(|v| {
                v.trim()
                    .parse::<f32>()
                    .map_err(|e| StoreError::Corrupt(format!("row {}: '{v}': {e}", line + 1)))
            })
            .collect::<Result<Vec<f32>, StoreError>>()?;
        set.add(GestureSample {
            features: FeatureVector::new(features),
            label: label.to_string(),
            timestamp: parse_timestamp(timestamp)?,
        });
    }
    Ok(set)
}
