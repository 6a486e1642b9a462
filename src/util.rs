pub fn mean(data: &[f32]) -> Option<f32> {
    let sum = data.iter().sum::<f32>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f32),
        _ => None,
    }
}

/// Population variance.
pub fn variance(data: &[f32]) -> Option<f32> {
    match (mean(data), data.len()) {
        (Some(data_mean), count) if count > 0 => {
            let sum_sq = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;

                    diff * diff
                })
                .sum::<f32>();

            Some(sum_sq / count as f32)
        }
        _ => None,
    }
}

/// Euclidean distance over the common prefix of two vectors.
///
/// Callers are expected to compare equal-length vectors; the centroid
/// classifier rejects mismatched lengths before getting here.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Element-wise mean of equal-length vectors.
pub fn element_wise_mean<'a, I>(vectors: I, len: usize) -> Option<Vec<f32>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut acc = vec![0.0f32; len];
    let mut count = 0usize;
    for v in vectors {
        if v.len() != len {
            return None;
        }
        for (slot, value) in acc.iter_mut().zip(v) {
            *slot += value;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    for slot in &mut acc {
        *slot /= count as f32;
    }
    Some(acc)
}
