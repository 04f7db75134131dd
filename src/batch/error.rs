#[derive(Debug)]
pub enum JobRuntimeError<I> {
    ReadFailed(JobReadFailed),
    WriteFailed(JobWriteFailed<I>),
}

#[derive(Debug)]
pub enum JobReadFailed {
    EmptyData(String),
    InvalidArguments(String),
    UnknownError(String),
}

impl std::fmt::Display for JobReadFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobReadFailed::EmptyData(message) => write!(f, "Empty data, {}", message),
            JobReadFailed::InvalidArguments(message) => write!(f, "Invalid arguments, {}", message),
            JobReadFailed::UnknownError(message) => write!(f, "Unknown, {}", message),
        }
    }
}

impl std::error::Error for JobReadFailed {}

pub struct JobWriteFailed<I> {
    item: Vec<I>,
    message: String,
}

impl<I> JobWriteFailed<I> {
    pub fn new(item: Vec<I>, message: &str) -> Self {
        JobWriteFailed {
            item,
            message: message.to_owned(),
        }
    }

    pub fn item(&self) -> &Vec<I> {
        &self.item
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<I> std::fmt::Display for JobWriteFailed<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl<I> std::fmt::Debug for JobWriteFailed<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl<I> std::error::Error for JobWriteFailed<I> {}
