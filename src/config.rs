use crate::{error::SyncError, turns::Actor};

pub const DEFAULT_ITERATIONS: usize = 5;
/// 1 MiB, the actors don't need more
pub const DEFAULT_STACK_SIZE: usize = 0x100000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// rounds per actor
    pub iterations: usize,
    /// whose slot starts available
    pub first: Actor,
    pub stack_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            first: Actor::Parent,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl Config {
    /// `[nloops]`, the program name is expected to be skipped already
    pub fn from_args<I>(mut args: I) -> Result<Self, SyncError>
    where
        I: Iterator,
        I::Item: AsRef<str>,
    {
        let mut config = Self::default();
        if let Some(raw) = args.next() {
            let raw = raw.as_ref();
            config.iterations = raw
                .trim()
                .parse()
                .map_err(|_| SyncError::InvalidIterations(raw.to_string()))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_args(std::iter::empty::<&str>()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.iterations, 5);
        assert_eq!(config.first, Actor::Parent);
    }

    #[test]
    fn test_loop_count() {
        assert_eq!(Config::from_args(["0"].into_iter()).unwrap().iterations, 0);
        assert_eq!(
            Config::from_args(["1000", "ignored"].into_iter())
                .unwrap()
                .iterations,
            1000
        );
    }

    #[test]
    fn test_bad_loop_count() {
        for bad in ["", "-1", "five", "1.5"] {
            let r = Config::from_args([bad].into_iter());
            assert!(matches!(r, Err(SyncError::InvalidIterations(s)) if s == bad));
        }
    }
}
