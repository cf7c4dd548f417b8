use crate::data_set::{DataSet, TagValue};
use crate::enums::Orientation;
use crate::frame::FrameInfo;
use crate::orientation::OrientationMatrix;
use crate::segment::{DimensionOrganization, Segment};

use dicom::core::Tag;
use image::{ImageBuffer, Luma, Rgb};
use nalgebra::Point3;
use ndarray::{Array3, Array4, ArrayView2, ArrayView3, s};

/// Voxel samples, indexed (slice, row, column[, channel]).
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeData {
    Scalar(Array3<u16>),
    Rgb(Array4<u8>),
}

impl VolumeData {
    pub fn channels(&self) -> usize {
        match self {
            VolumeData::Scalar(_) => 1,
            VolumeData::Rgb(_) => 3,
        }
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        match self {
            VolumeData::Scalar(data) => data.len(),
            VolumeData::Rgb(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Geometry {
    /// Origin of the first slice.
    pub origin: Point3<f64>,
    /// (columns, rows, slices)
    pub size: [usize; 3],
    /// (column, row, slice) spacing
    pub spacing: [f64; 3],
    pub orientation: OrientationMatrix,
    /// World origin of every slice.
    pub origins: Vec<Point3<f64>>,
}

#[derive(Debug, Clone)]
pub struct VolumeMetadata {
    /// Default segmentation tags overridden with the object's identifiers.
    pub tags: DataSet,
    pub dimension_organization: DimensionOrganization,
    pub segments: Vec<Segment>,
    pub frame_infos: Vec<FrameInfo>,
    pub slice_count: usize,
}

/// Decoded segmentation. Samples and geometry are fixed once built; only
/// metadata tags can be attached afterwards.
#[derive(Debug, Clone)]
pub struct Volume {
    data: VolumeData,
    geometry: Geometry,
    metadata: VolumeMetadata,
}

impl Volume {
    pub fn new(data: VolumeData, geometry: Geometry, metadata: VolumeMetadata) -> Self {
        Self {
            data,
            geometry,
            metadata,
        }
    }

    /// Get the dimensions of the volume (slices, rows, columns)
    pub fn dim(&self) -> (usize, usize, usize) {
        let [columns, rows, slices] = self.geometry.size;
        (slices, rows, columns)
    }

    pub fn data(&self) -> &VolumeData {
        &self.data
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn metadata(&self) -> &VolumeMetadata {
        &self.metadata
    }

    pub fn is_rgb(&self) -> bool {
        matches!(self.data, VolumeData::Rgb(_))
    }

    /// Replace or add a metadata tag.
    pub fn set_tag(&mut self, tag: Tag, value: TagValue) {
        self.metadata.tags.insert(tag, value);
    }

    /// Scalar samples of one plane through the volume, `None` in RGB mode.
    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: &Orientation,
    ) -> Option<ArrayView2<'_, u16>> {
        let VolumeData::Scalar(data) = &self.data else {
            return None;
        };
        if !self.is_valid_index(index, orientation) {
            return None;
        }
        let slice = match orientation {
            Orientation::Axial => data.slice(s![index, .., ..]),
            Orientation::Coronal => data.slice(s![.., index, ..]),
            Orientation::Sagittal => data.slice(s![.., .., index]),
        };
        Some(slice)
    }

    /// RGB samples of one plane through the volume, `None` in scalar mode.
    pub fn get_rgb_slice_from_axis(
        &self,
        index: usize,
        orientation: &Orientation,
    ) -> Option<ArrayView3<'_, u8>> {
        let VolumeData::Rgb(data) = &self.data else {
            return None;
        };
        if !self.is_valid_index(index, orientation) {
            return None;
        }
        let slice = match orientation {
            Orientation::Axial => data.slice(s![index, .., .., ..]),
            Orientation::Coronal => data.slice(s![.., index, .., ..]),
            Orientation::Sagittal => data.slice(s![.., .., index, ..]),
        };
        Some(slice)
    }

    fn is_valid_index(&self, index: usize, orientation: &Orientation) -> bool {
        let dim = self.dim();
        let max_index = match orientation {
            Orientation::Axial => dim.0,
            Orientation::Coronal => dim.1,
            Orientation::Sagittal => dim.2,
        };
        index < max_index
    }

    /// Axial slice as a 16 bit grayscale image.
    pub fn get_gray_image(&self, index: usize) -> Option<ImageBuffer<Luma<u16>, Vec<u16>>> {
        let slice = self.get_slice_from_axis(index, &Orientation::Axial)?;
        let (height, width) = slice.dim();
        ImageBuffer::from_raw(width as u32, height as u32, slice.iter().copied().collect())
    }

    /// Axial slice as an 8 bit RGB image.
    pub fn get_rgb_image(&self, index: usize) -> Option<ImageBuffer<Rgb<u8>, Vec<u8>>> {
        let slice = self.get_rgb_slice_from_axis(index, &Orientation::Axial)?;
        let (height, width, _) = slice.dim();
        ImageBuffer::from_raw(width as u32, height as u32, slice.iter().copied().collect())
    }
}
