//! Template matching error types

use lookout_raster::ColorSpace;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("{0} image is empty")]
    EmptyImage(&'static str),

    #[error("template {template_width}x{template_height} is larger than source {source_width}x{source_height}")]
    TemplateTooLarge {
        template_width: u32,
        template_height: u32,
        source_width: u32,
        source_height: u32,
    },

    #[error("template layout {template_space} ({template_channels} channels) cannot be matched against {source_space} ({source_channels} channels)")]
    ChannelMismatch {
        source_space: ColorSpace,
        source_channels: usize,
        template_space: ColorSpace,
        template_channels: usize,
    },
}

pub type Result<T> = std::result::Result<T, MatchError>;
