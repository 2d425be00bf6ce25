use chrono::{Local, NaiveDateTime, Timelike};

/// Wall-clock source for directory-entry timestamps and volume serials.
///
/// The engine never reads the system clock directly; it goes through this
/// trait so tests can pin time.
pub trait Clock: std::fmt::Debug {
    fn now(&self) -> NaiveDateTime;
}

/// The local system clock.
#[derive(Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to a single instant, for deterministic tests.
#[derive(Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Derives a 32-bit volume serial from a point in time. Sub-second precision
/// keeps back-to-back formats from colliding on a real clock while staying
/// deterministic under `FixedClock`.
pub fn derive_serial(now: NaiveDateTime) -> u32 {
    let secs = now.and_utc().timestamp() as u32;
    secs ^ now.nanosecond().rotate_left(16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1994, 6, 15)
            .unwrap()
            .and_hms_opt(13, 37, 42)
            .unwrap()
    }

    #[test]
    fn fixed_clock_is_deterministic() {
        let clock = FixedClock(fixed_instant());
        assert_eq!(clock.now(), clock.now());
        assert_eq!(derive_serial(clock.now()), derive_serial(clock.now()));
    }

    #[test]
    fn serial_differs_across_instants() {
        let a = derive_serial(fixed_instant());
        let b = derive_serial(fixed_instant() + chrono::Duration::seconds(1));
        assert_ne!(a, b);
    }
}
