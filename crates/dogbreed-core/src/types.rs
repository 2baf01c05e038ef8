//! Core type definitions for the dog breed trainer.

use std::fmt;
use std::str::FromStr;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Supported network architectures.
///
/// Each variant carries a fixed learning rate used when the model is
/// compiled; the rate is not part of the run configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// AlexNet
    AlexNet,
    /// VGG-16
    Vgg16,
    /// ResNet-50
    ResNet50,
    /// MobileNet (v1, width 1.0)
    MobileNet,
}

impl Architecture {
    /// Every supported architecture, in declaration order.
    pub const ALL: [Architecture; 4] = [
        Architecture::AlexNet,
        Architecture::Vgg16,
        Architecture::ResNet50,
        Architecture::MobileNet,
    ];

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Architecture::AlexNet => "alexnet",
            Architecture::Vgg16 => "vgg16",
            Architecture::ResNet50 => "resnet50",
            Architecture::MobileNet => "mobilenet",
        }
    }

    /// Learning rate the architecture is compiled with
    pub fn learning_rate(&self) -> f64 {
        match self {
            Architecture::AlexNet => 0.001,
            Architecture::Vgg16 => 0.0001,
            Architecture::ResNet50 => 0.0002,
            Architecture::MobileNet => 0.0001,
        }
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::MobileNet
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Architecture::ALL
            .into_iter()
            .find(|arch| arch.name() == s)
            .ok_or_else(|| Error::UnsupportedArchitecture(s.to_string()))
    }
}

/// Model input shape in channels-last order (height, width, channels)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputShape {
    /// Image height in pixels
    pub height: usize,
    /// Image width in pixels
    pub width: usize,
    /// Number of channels (3 for RGB)
    pub channels: usize,
}

impl InputShape {
    /// Creates a new input shape
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Standard ImageNet shape (224x224x3)
    pub fn imagenet() -> Self {
        Self::new(224, 224, 3)
    }

    /// Shape as `[height, width, channels]`
    pub fn dims(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    /// Number of values in one image
    pub fn num_values(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl Default for InputShape {
    fn default() -> Self {
        Self::imagenet()
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.height, self.width, self.channels)
    }
}

/// Dataset split
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataSplit {
    /// Training data
    Train,
    /// Held-out test data (also used for per-epoch validation)
    Test,
}

impl DataSplit {
    /// Directory name of the split under the dataset root
    pub fn dir_name(&self) -> &'static str {
        match self {
            DataSplit::Train => "train",
            DataSplit::Test => "test",
        }
    }
}

impl fmt::Display for DataSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Identifier namespacing the artifacts of one training run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Timestamp format used for generated run ids
    pub const FORMAT: &'static str = "%Y%m%d-%H%M%S";

    /// Generate a run id from the current local time
    pub fn now() -> Self {
        Self(Local::now().format(Self::FORMAT).to_string())
    }

    /// Use an explicit run id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
