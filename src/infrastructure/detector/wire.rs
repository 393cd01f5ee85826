//! Detector Wire Format
//!
//! Row encode/decode for the `(20, 6+E)` float32 shared-memory output
//! buffer spec.md §4.3/§6 defines (`E=0` object detector, `E=128` face
//! detector), independent of the shared-memory transport, so the
//! encode/decode round-trip is testable without a real segment.

/// Fixed row capacity per spec.md §4.3.
pub const MAX_DETECTIONS: usize = 20;
/// Fixed columns before the optional embedding tail.
pub const BASE_ROW_WIDTH: usize = 6;
/// Embedding width for the face detector's output rows.
pub const FACE_EMBEDDING_WIDTH: usize = 128;

/// One decoded output row: `[label_id, confidence, ymin, xmin, ymax, xmax]`
/// plus an optional embedding tail, all normalized `[0,1]` relative to the
/// region (spec.md §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct WireDetection {
    pub label_id: i32,
    pub confidence: f32,
    pub ymin: f32,
    pub xmin: f32,
    pub ymax: f32,
    pub xmax: f32,
    pub embedding: Vec<f32>,
}

impl WireDetection {
    pub fn object(label_id: i32, confidence: f32, ymin: f32, xmin: f32, ymax: f32, xmax: f32) -> Self {
        Self { label_id, confidence, ymin, xmin, ymax, xmax, embedding: Vec::new() }
    }

    pub fn face(confidence: f32, ymin: f32, xmin: f32, ymax: f32, xmax: f32, embedding: Vec<f32>) -> Self {
        Self { label_id: 0, confidence, ymin, xmin, ymax, xmax, embedding }
    }
}

/// The byte/float length of one output buffer for a given embedding width.
pub fn buffer_len(embedding_width: usize) -> usize {
    MAX_DETECTIONS * (BASE_ROW_WIDTH + embedding_width)
}

/// Encodes up to `MAX_DETECTIONS` detections (already sorted by descending
/// confidence by the caller) into a fixed `(20, 6+E)` buffer, zero-padding
/// unused trailing rows per spec.md §4.3's sentinel rule.
pub fn encode(detections: &[WireDetection], embedding_width: usize) -> Vec<f32> {
    let row_width = BASE_ROW_WIDTH + embedding_width;
    let mut buffer = vec![0f32; MAX_DETECTIONS * row_width];

    for (row, detection) in detections.iter().take(MAX_DETECTIONS).enumerate() {
        let base = row * row_width;
        buffer[base] = detection.label_id as f32;
        buffer[base + 1] = detection.confidence;
        buffer[base + 2] = detection.ymin;
        buffer[base + 3] = detection.xmin;
        buffer[base + 4] = detection.ymax;
        buffer[base + 5] = detection.xmax;
        if embedding_width > 0 {
            for (i, value) in detection.embedding.iter().take(embedding_width).enumerate() {
                buffer[base + BASE_ROW_WIDTH + i] = *value;
            }
        }
    }
    buffer
}

/// Decodes a `(20, 6+E)` buffer back into rows. Does not filter by
/// confidence threshold — callers apply their own acceptance test, per
/// spec.md §4.6/§4.5.1.
pub fn decode(buffer: &[f32], embedding_width: usize) -> Vec<WireDetection> {
    let row_width = BASE_ROW_WIDTH + embedding_width;
    buffer
        .chunks_exact(row_width)
        .map(|row| WireDetection {
            label_id: row[0] as i32,
            confidence: row[1],
            ymin: row[2],
            xmin: row[3],
            ymax: row[4],
            xmax: row[5],
            embedding: if embedding_width > 0 { row[BASE_ROW_WIDTH..row_width].to_vec() } else { Vec::new() },
        })
        .collect()
}

/// Sorts detections by descending confidence, per spec.md §4.3's output
/// ordering requirement.
pub fn sort_by_confidence_desc(detections: &mut [WireDetection]) {
    detections.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
}

/// Little-endian float encoding for a shared-memory slab, shared by both
/// ends of the transport (`remote_client` and `shmem_server`).
pub fn floats_to_bytes(floats: &[f32]) -> Vec<u8> {
    floats.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// The inverse of `floats_to_bytes`.
pub fn bytes_to_floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("chunks_exact(4) guarantees 4 bytes")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips_object_rows() {
        let detections = vec![
            WireDetection::object(1, 0.95, 0.1, 0.2, 0.3, 0.4),
            WireDetection::object(2, 0.80, 0.5, 0.6, 0.7, 0.8),
        ];
        let buffer = encode(&detections, 0);
        assert_eq!(buffer.len(), buffer_len(0));

        let decoded = decode(&buffer, 0);
        assert_eq!(decoded.len(), MAX_DETECTIONS);
        assert_eq!(decoded[0], detections[0]);
        assert_eq!(decoded[1], detections[1]);
    }

    #[test]
    fn trailing_rows_are_zeroed_sentinels() {
        let detections = vec![WireDetection::object(1, 0.9, 0.0, 0.0, 0.1, 0.1)];
        let buffer = encode(&detections, 0);
        let decoded = decode(&buffer, 0);
        assert_eq!(decoded[1].confidence, 0.0);
        assert_eq!(decoded[MAX_DETECTIONS - 1].confidence, 0.0);
    }

    #[test]
    fn encode_decode_round_trips_face_embeddings() {
        let embedding: Vec<f32> = (0..FACE_EMBEDDING_WIDTH).map(|i| i as f32 * 0.01).collect();
        let detections = vec![WireDetection::face(0.88, 0.1, 0.1, 0.2, 0.2, embedding.clone())];
        let buffer = encode(&detections, FACE_EMBEDDING_WIDTH);
        let decoded = decode(&buffer, FACE_EMBEDDING_WIDTH);
        assert_eq!(decoded[0].embedding, embedding);
    }

    #[test]
    fn sort_by_confidence_desc_orders_highest_first() {
        let mut detections = vec![
            WireDetection::object(1, 0.3, 0.0, 0.0, 0.1, 0.1),
            WireDetection::object(2, 0.9, 0.0, 0.0, 0.1, 0.1),
            WireDetection::object(3, 0.6, 0.0, 0.0, 0.1, 0.1),
        ];
        sort_by_confidence_desc(&mut detections);
        let confidences: Vec<f32> = detections.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.6, 0.3]);
    }

    #[test]
    fn caps_encoded_detections_at_max_detections() {
        let many: Vec<WireDetection> = (0..30).map(|i| WireDetection::object(i, 0.5, 0.0, 0.0, 0.1, 0.1)).collect();
        let buffer = encode(&many, 0);
        assert_eq!(buffer.len(), buffer_len(0));
    }
}
