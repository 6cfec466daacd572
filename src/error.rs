use thiserror::Error;

/// Errors that can occur while opening or operating the HID gadget
/// transport. These map to the "fatal" row of the error handling table:
/// anything that reaches here ends the controller's run loop.
#[derive(Error, Debug)]
pub enum GadgetError {
    #[error("failed to open gadget device node `{path}`: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to set non-blocking mode on gadget device node: {0}")]
    SetNonBlocking(#[from] nix::Error),
    #[error("gadget channel read failed: {0}")]
    Read(std::io::Error),
    #[error("gadget channel write failed: {0}")]
    Write(std::io::Error),
    #[error("gadget channel is not open")]
    NotConnected,
}
