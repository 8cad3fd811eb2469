//! Transport abstraction
//!
//! The protocol engine never opens sockets. A connection is anything that can
//! read, write and close bytes; TCP, TLS and WebSocket specifics live with the
//! implementor. Both synchronous and (with the `async` feature) asynchronous
//! flavors are provided.
//!

#![allow(async_fn_in_trait)]
#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

pub use error::Error;

/// Re-exports of common traits
pub mod prelude {
    #[cfg(feature = "async")]
    pub use super::{AsyncClose, AsyncConnection, AsyncRead, AsyncWrite};
    pub use super::{Close, Connection, Read, Write};
}

/// Byte source.
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read available bytes into `buf`, returning how many. Zero means the peer
    /// closed the connection.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Byte sink.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write all of `buf`, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<(), Error> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => buf = &buf[n..],
                Err(_) => return Err(Error::WriteError),
            }
        }
        Ok(())
    }
}

/// Connection teardown.
pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// Byte source, asynchronously.
#[cfg(feature = "async")]
pub trait AsyncRead {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection asynchronously
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Byte sink, asynchronously.
#[cfg(feature = "async")]
pub trait AsyncWrite {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection asynchronously
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer asynchronously
    async fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write all of `buf`, retrying short writes.
    async fn write_all(&mut self, mut buf: &[u8]) -> Result<(), Error> {
        while !buf.is_empty() {
            match self.write(buf).await {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => buf = &buf[n..],
                Err(_) => return Err(Error::WriteError),
            }
        }
        Ok(())
    }
}

/// Connection teardown, asynchronously.
#[cfg(feature = "async")]
pub trait AsyncClose {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection asynchronously
    async fn close(self) -> Result<(), Self::Error>;
}

/// An asynchronous connection
#[cfg(feature = "async")]
pub trait AsyncConnection: AsyncRead + AsyncWrite + AsyncClose {}
