use std::time::Duration;

/// A primitive was asked to do something which could never work.
///
/// These are reported when the primitive is built, never later when it is used.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConfigError {
    #[error("A barrier needs at least one participant")]
    ZeroParticipants,

    #[error("Backoff delays must satisfy 0 < initial <= max, got initial={initial:?} max={max:?}")]
    InvalidBackoff { initial: Duration, max: Duration },
}

/// A bounded operation ran out of attempts because other threads kept winning.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContentionError {
    #[error("Gave up after {attempts} failed compare-and-swap attempts")]
    RetriesExhausted { attempts: u32 },
}

#[derive(Debug, derive_more::Display, derive_more::IsVariant)]
enum ErrorPayload {
    #[display(fmt = "Invalid configuration: {}", _0)]
    Config(ConfigError),

    #[display(fmt = "Contention: {}", _0)]
    Contention(ContentionError),
}

#[derive(Debug, thiserror::Error)]
#[error("{payload}")]
pub struct Error {
    payload: ErrorPayload,
}

macro_rules! conv {
    ($variant: ident, $from_err: path) => {
        impl From<$from_err> for Error {
            fn from(value: $from_err) -> Error {
                Error {
                    payload: ErrorPayload::$variant(value),
                }
            }
        }
    };
}

conv!(Config, ConfigError);
conv!(Contention, ContentionError);

impl Error {
    /// Was a primitive constructed with parameters it cannot work with?
    pub fn is_config(&self) -> bool {
        self.payload.is_config()
    }

    /// Did a bounded retry loop give up?
    pub fn is_contention(&self) -> bool {
        self.payload.is_contention()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
