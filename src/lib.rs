//! # DICOM-seg library
//!
//! This crate decodes DICOM Segmentation (SEG) objects into label volumes.
//!
//! A binary segmentation stores one 2D mask per frame, each frame belonging
//! to one segment. Frames only exist where a segment is present, come in no
//! guaranteed order and carry their own position, orientation and spacing.
//! The decoder validates the object, reconciles the frame geometry into a
//! single uniformly spaced slice grid (inserting the empty slices that have
//! no frame) and merges every mask into one volume using the display value
//! of its segment. When any segment has a CIELab display colour the volume
//! is stored as RGB.
//!
//! Supported objects:
//!  - Segmentation Type BINARY
//!  - Dimension Organization Type 3D
//!  - One orientation and one pixel spacing for all frames
//!
//! The write phase runs in parallel using rayon unless
//! [`Processor::Serial`] is requested.
//!
//! # Examples
//!
//! ## Reading a segmentation file
//!
//! ```no_run
//! # use dicom_seg::{SegLoader, DecodeOptions};
//! let decoded = SegLoader::load_from_file("seg.dcm", DecodeOptions::default())
//!     .expect("should have decoded the segmentation");
//! for warning in &decoded.warnings {
//!     eprintln!("{warning}");
//! }
//! let volume = decoded.volume;
//! println!(
//!     "{} slices, orientation {}",
//!     volume.metadata().slice_count,
//!     volume.geometry().orientation.orientation_code()
//! );
//! ```
//!
//! [`Processor::Serial`]: enums::Processor::Serial

pub mod colour;
pub mod data_set;
pub mod enums;
pub mod error;
pub mod frame;
pub mod orientation;
pub mod reconciler;
pub mod seg_decoder;
pub mod seg_loader;
pub mod segment;
pub mod tag_validator;
pub mod volume;

pub use data_set::{DataSet, TagValue};
pub use error::SegError;
pub use orientation::OrientationMatrix;
pub use reconciler::DecodeWarning;
pub use seg_decoder::{DecodeOptions, DecodedSeg, SegDecoder};
pub use seg_loader::SegLoader;
pub use volume::{Volume, VolumeData};
