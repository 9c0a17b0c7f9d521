//! Subcommand implementations.

mod fetch;
mod get;

pub use fetch::run_fetch;
pub use get::run_get;

/// Human-readable byte size (B/KB/MB/GB).
fn readable_size(value: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut v = value as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if v < 1024.0 {
            return if *unit == "B" {
                format!("{} {}", value, unit)
            } else {
                format!("{:.1} {}", v, unit)
            };
        }
        v /= 1024.0;
    }
    format!("{:.1} GB", v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes() {
        assert_eq!(readable_size(0), "0 B");
        assert_eq!(readable_size(1023), "1023 B");
    }

    #[test]
    fn kilobytes_and_up() {
        assert_eq!(readable_size(1024), "1.0 KB");
        assert_eq!(readable_size(1536), "1.5 KB");
        assert_eq!(readable_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(readable_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
