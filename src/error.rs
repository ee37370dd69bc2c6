//! Error types for the tacrv back end

use thiserror::Error;

/// Back end errors
///
/// Every variant is fatal for the run that raised it: the compiler aborts
/// before a listing is produced and never retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Instruction that violates the IR contract
    ///
    /// **Triggered by:** an immediate destination, or an immediate operand in
    /// a position the target cannot encode
    /// **Example:** `(ADD, 3, x, y)`
    #[error("Malformed instruction #{index}: {message}")]
    MalformedInstruction {
        /// Position of the offending instruction in its stream
        index: usize,
        /// Error description
        message: String,
    },

    /// Forced eviction found no register outside the exclusion set
    ///
    /// **Triggered by:** an instruction pinning every register of the pool
    /// **Prevention:** keep the pool larger than three registers
    #[error("No evictable register: pool of {pool_size} fully excluded ({})", .excluded.join(", "))]
    NoEvictableRegister {
        /// Number of allocatable registers
        pool_size: usize,
        /// Registers that could not be chosen
        excluded: Vec<String>,
    },

    /// Use count lookup for a variable the usage analysis never recorded
    #[error("Unknown usage for variable {name}")]
    UnknownUsage {
        /// Variable name
        name: String,
    },

    /// Textual IR could not be read
    #[error("IR parse error at line {line}: {message}")]
    ParseError {
        /// 1-based source line
        line: usize,
        /// Error description
        message: String,
    },

    /// Compile options outside the supported range
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl Error {
    /// Create a malformed instruction error
    pub fn malformed(index: usize, message: impl Into<String>) -> Self {
        Error::MalformedInstruction {
            index,
            message: message.into(),
        }
    }

    /// Create an unknown usage error for a variable name
    pub fn unknown_usage(name: impl Into<String>) -> Self {
        Error::UnknownUsage { name: name.into() }
    }

    /// Create a parse error at the given 1-based line
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::ParseError {
            line,
            message: message.into(),
        }
    }
}

/// Result type for tacrv operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::malformed(3, "destination is an immediate");
        assert_eq!(
            err.to_string(),
            "Malformed instruction #3: destination is an immediate"
        );

        let err = Error::NoEvictableRegister {
            pool_size: 3,
            excluded: vec!["t0".into(), "t1".into(), "t2".into()],
        };
        assert!(err.to_string().contains("t0, t1, t2"));

        assert_eq!(
            Error::unknown_usage("x").to_string(),
            "Unknown usage for variable x"
        );
    }
}
