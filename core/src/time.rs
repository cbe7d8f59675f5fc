use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current time in milliseconds since the unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system time is after the unix epoch").as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_now_is_millis() {
        let now = unix_now();
        // Between 2020 and 2120 in milliseconds
        assert!(now > 1_577_836_800_000);
        assert!(now < 4_733_510_400_000);
    }
}
