/// All the errors that can occur when building or updating a manager stack.
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// An adaptor was configured with an invalid value (non-positive cutoff,
    /// missing required option, adaptor incompatible with its predecessor)
    Configuration(String),
    /// The unit cell is degenerate or otherwise incompatible with the
    /// requested neighbor search
    Geometry(String),
    /// Out of range atom tag or cluster index
    Index(String),
    /// A stage detected a cluster violating the sub-cluster closure
    /// invariant. This is an internal bug, it can not be triggered by
    /// valid input
    Consistency(String),
    /// Misuse of the build protocol, e.g. reading cluster data from a stage
    /// that has not been built yet
    Internal(String),
    /// Error while serializing/deserializing adaptor parameters
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Configuration(e) => write!(f, "configuration error: {}", e),
            Error::Geometry(e) => write!(f, "geometry error: {}", e),
            Error::Index(e) => write!(f, "index error: {}", e),
            Error::Consistency(e) => write!(f, "consistency error (this is a bug): {}", e),
            Error::Internal(e) => write!(f, "internal error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Configuration(_)
            | Error::Geometry(_)
            | Error::Index(_)
            | Error::Consistency(_)
            | Error::Internal(_) => None,
            Error::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let error = Error::Configuration("expected a positive cutoff, got -3".into());
        assert_eq!(
            error.to_string(),
            "configuration error: expected a positive cutoff, got -3"
        );

        let error = Error::Index("atom index 12 is out of bounds for 6 atoms".into());
        assert_eq!(
            error.to_string(),
            "index error: atom index 12 is out of bounds for 6 atoms"
        );
    }
}
