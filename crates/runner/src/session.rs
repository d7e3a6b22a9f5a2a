//! The single browser session shared by every step of a run

use tracing::{debug, warn};

use crate::driver::BrowserDriver;
use crate::error::DriverResult;

/// Owns the driver and tracks the frame-context stack
pub struct Session {
    driver: Box<dyn BrowserDriver>,
    frames: Vec<usize>,
}

impl Session {
    pub fn new(driver: impl BrowserDriver + 'static) -> Self {
        Self {
            driver: Box::new(driver),
            frames: Vec::new(),
        }
    }

    pub fn driver(&mut self) -> &mut dyn BrowserDriver {
        self.driver.as_mut()
    }

    /// Number of frames entered below the top-level document
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub async fn enter_frame(&mut self, index: usize) -> DriverResult<()> {
        self.driver.enter_frame(index).await?;
        self.frames.push(index);
        debug!("Entered frame {} (depth {})", index, self.frames.len());
        Ok(())
    }

    /// The frame stays tracked until the driver confirms the exit
    pub async fn exit_frame(&mut self) -> DriverResult<()> {
        if let Some(&index) = self.frames.last() {
            debug!("Leaving frame {}", index);
            self.driver.exit_frame().await?;
            self.frames.pop();
        }
        Ok(())
    }

    /// Drop back to the top-level document regardless of the tracked stack.
    ///
    /// Used after a failed or cancelled step list, when the driver and the
    /// tracked stack may disagree.
    pub async fn reset_context(&mut self) {
        self.frames.clear();
        if let Err(e) = self.driver.reset_frames().await {
            warn!("Failed to reset frame context: {}", e);
        }
    }

    pub async fn close(mut self) -> DriverResult<()> {
        self.driver.close().await
    }
}
