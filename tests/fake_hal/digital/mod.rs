use super::concurrent;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};

#[derive(Debug, PartialEq)]
pub enum Error {
    Disconnected,
}

impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// An input pin that plays back a sequence of levels, then holds `default_data`.
///
/// As an async line, an edge is available whenever `edges` is set; otherwise waits never end.
#[derive(Debug)]
pub struct Pin {
    data_to_read: Option<Vec<u8>>,
    name: &'static str,
    default_data: bool,
    broken: bool,
    edges: bool,
}

impl Pin {
    pub fn new(name: &'static str) -> Pin {
        concurrent::set_named_value(name, 0);
        Pin {
            data_to_read: None,
            name,
            default_data: true,
            broken: false,
            edges: false,
        }
    }

    /// A pin whose every read fails.
    pub fn broken(name: &'static str) -> Pin {
        Pin {
            broken: true,
            ..Pin::new(name)
        }
    }

    pub fn set_default_data(&mut self, default: bool) {
        self.default_data = default;
        self.data_to_read = None;
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data_to_read = Some(data);
        concurrent::set_named_value(self.name, 0);
    }

    pub fn set_edges(&mut self, edges: bool) {
        self.edges = edges;
    }

    fn next_level(&mut self) -> Result<bool, Error> {
        if self.broken {
            return Err(Error::Disconnected);
        }
        let data = match self.data_to_read.as_ref() {
            Some(data) => data,
            None => return Ok(self.default_data),
        };
        let data_index = concurrent::get_and_increment_named_value(self.name);
        Ok(data.get(data_index).map_or(self.default_data, |level| *level > 0))
    }
}

impl ErrorType for Pin {
    type Error = Error;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.next_level()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.next_level().map(|high| !high)
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::digital::Wait for Pin {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        self.wait_for_any_edge().await
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        self.wait_for_any_edge().await
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        self.wait_for_any_edge().await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        self.wait_for_any_edge().await
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        if self.broken {
            return Err(Error::Disconnected);
        }
        if self.edges {
            return Ok(());
        }
        std::future::pending().await
    }
}
