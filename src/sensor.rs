use crate::error::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Parse one line of sensor output as a distance in millimetres.
///
/// Blank lines and non-finite or unparsable values yield `None`.
pub fn parse_sample(line: &str) -> Option<f64> {
    let text = line.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => None,
    }
}

/// Reads distance samples, one per line, and forwards them to the runtime
pub struct SensorFeed<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> SensorFeed<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Forward samples until end of input or until the receiver is dropped.
    /// Returns the number of samples forwarded.
    pub async fn run(self, samples: mpsc::Sender<f64>) -> Result<u64> {
        let mut lines = self.reader.lines();
        let mut forwarded = 0u64;

        while let Some(line) = lines.next_line().await? {
            let Some(sample) = parse_sample(&line) else {
                if !line.trim().is_empty() {
                    warn!("Ignoring malformed sensor sample {:?}", line);
                }
                continue;
            };

            if samples.send(sample).await.is_err() {
                debug!("Sample receiver closed, stopping sensor feed");
                return Ok(forwarded);
            }
            forwarded += 1;
        }

        info!("Sensor input ended after {} samples", forwarded);
        Ok(forwarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample() {
        assert_eq!(parse_sample("42.5"), Some(42.5));
        assert_eq!(parse_sample("  17 \r"), Some(17.0));
        assert_eq!(parse_sample("-3"), Some(-3.0));
        assert_eq!(parse_sample(""), None);
        assert_eq!(parse_sample("abc"), None);
        assert_eq!(parse_sample("NaN"), None);
        assert_eq!(parse_sample("inf"), None);
    }

    #[tokio::test]
    async fn test_feed_forwards_valid_lines() {
        let input: &[u8] = b"10\n\ngarbage\n20.5\r\n30";
        let (tx, mut rx) = mpsc::channel(16);

        let forwarded = SensorFeed::new(input).run(tx).await.unwrap();

        assert_eq!(forwarded, 3);
        let mut received = Vec::new();
        while let Some(sample) = rx.recv().await {
            received.push(sample);
        }
        assert_eq!(received, vec![10.0, 20.5, 30.0]);
    }

    #[tokio::test]
    async fn test_feed_stops_when_receiver_dropped() {
        let input: &[u8] = b"1\n2\n3\n";
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let forwarded = SensorFeed::new(input).run(tx).await.unwrap();

        assert_eq!(forwarded, 0);
    }
}
