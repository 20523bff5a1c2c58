//! cinereel turns a textual script plus directories of character and
//! location images into a narrated slideshow video.
//!
//! The pipeline is sequential by design: the script is segmented into
//! scenes, every scene gets a normalized frame set and a narration track,
//! and the timing assembler admits scenes in order against a duration
//! budget before streaming the surviving clips into one ffmpeg encode.
//!
//! - Parse a script with [`parse_script`]
//! - Load assets with [`CharacterLibrary`] and [`LocationPool`]
//! - Run the whole pipeline through [`Generator::generate`]
#![forbid(unsafe_code)]

mod foundation;

pub mod assets;
pub mod audio;
pub mod config;
pub mod encode;
pub mod pipeline;
pub mod render;
pub mod script;
pub mod timeline;

pub use crate::assets::characters::{Character, CharacterLibrary, IMAGE_EXTENSIONS};
pub use crate::assets::locations::LocationPool;
pub use crate::audio::narration::{CommandNarrator, NarrationEngine};
pub use crate::config::ReelConfig;
pub use crate::foundation::error::{ReelError, ReelResult};
pub use crate::pipeline::Generator;
pub use crate::script::scene::Scene;
pub use crate::script::segment::parse_script;
pub use crate::timeline::{AssemblyBudget, AssemblyReport, SceneMediaBundle, SceneSkip};
