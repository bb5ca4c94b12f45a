use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("node {0} does not exist")]
    InvalidNode(usize),

    #[error("node {0} already exists")]
    DuplicateNode(usize),

    #[error("arc {src}->{dst} already exists")]
    DuplicateArc { src: usize, dst: usize },

    #[error("arc {src}->{dst} does not exist")]
    MissingArc { src: usize, dst: usize },

    #[error("self-loop on node {0} is not supported")]
    SelfLoop(usize),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid scheduling network: {0}")]
    TaskNetwork(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FlowError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        FlowError::Parse { line, message: message.into() }
    }
}
