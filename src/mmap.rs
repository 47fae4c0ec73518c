//! Memory-mapping support for fixed-layout binary elements.
//!
//! No example in this crate's ancestry memory-maps anything; this module
//! takes `memmap2` (the maintained successor to the unmaintained `memmap`
//! crate) as a new, explicit dependency, used exactly the way its own docs
//! recommend: `Mmap::map(&file)` for read-only access, `MmapMut::map_mut`
//! for read-write. The mapping's lifetime is owned by the
//! [`crate::table::RowTable`] that was built from it.

use std::fs::File;
use std::io;

use memmap2::{Mmap, MmapMut};

use crate::errors::{PlyError, PlyResult};
use crate::types::element::ElementSchema;
use crate::types::scalar::{ByteOrderTag, ScalarType};

/// Either a read-only or a read-write memory mapping of a region of a file.
pub enum MmapHandle {
    /// Read-only mapping; the file is never written through this handle.
    ReadOnly(Mmap),
    /// Read-write mapping; [`MappedElement::flush`] pushes writes to disk.
    ReadWrite(MmapMut),
}

impl MmapHandle {
    /// The mapped bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MmapHandle::ReadOnly(m) => m,
            MmapHandle::ReadWrite(m) => m,
        }
    }

    /// The mapped bytes, mutably. `None` for a read-only mapping.
    pub fn as_bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            MmapHandle::ReadOnly(_) => None,
            MmapHandle::ReadWrite(m) => Some(m),
        }
    }
}

/// Byte offset, within one row, of a single fixed-layout property.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    /// Property name.
    pub name: String,
    /// Scalar type stored at this offset.
    pub ty: ScalarType,
    /// Byte offset from the start of the row.
    pub offset: usize,
}

/// A memory-mapped, fixed-layout element region: the raw bytes plus enough
/// layout information to decode any row or column on demand.
pub struct MappedElement {
    mmap: MmapHandle,
    byte_order: ByteOrderTag,
    row_stride: usize,
    count: usize,
    fields: Vec<FieldLayout>,
}

impl MappedElement {
    /// Builds the per-row field layout for a fixed-layout element schema.
    /// Errors if the element is not fixed-layout (i.e. contains a list
    /// property), since only fixed-layout elements have a constant stride.
    pub fn layout_for(schema: &ElementSchema) -> PlyResult<Vec<FieldLayout>> {
        let mut offset = 0usize;
        let mut fields = Vec::with_capacity(schema.properties.len());
        for prop in schema.properties.values() {
            let ty = match prop.data_type {
                crate::types::property::PropertyType::Scalar(ty) => ty,
                crate::types::property::PropertyType::List { .. } => {
                    return Err(PlyError::MemoryMap(format!(
                        "element '{}' is not fixed-layout (property '{}' is a list)",
                        schema.name, prop.name
                    )));
                }
            };
            fields.push(FieldLayout { name: prop.name.clone(), ty, offset });
            offset += ty.byte_width();
        }
        Ok(fields)
    }

    /// Opens a read-only memory map over `count` rows of `row_stride` bytes
    /// each, starting at `byte_offset` in `file`.
    pub fn open_read(
        file: &File,
        byte_offset: u64,
        row_stride: usize,
        count: usize,
        byte_order: ByteOrderTag,
        fields: Vec<FieldLayout>,
    ) -> io::Result<MappedElement> {
        let len = row_stride.checked_mul(count).expect("row_stride * count overflow");
        let mmap = unsafe {
            memmap2::MmapOptions::new()
                .offset(byte_offset)
                .len(len)
                .map(file)?
        };
        Ok(MappedElement {
            mmap: MmapHandle::ReadOnly(mmap),
            byte_order,
            row_stride,
            count,
            fields,
        })
    }

    /// Opens a read-write memory map over the same region shape as
    /// [`Self::open_read`]. Writes through the returned table are visible
    /// to other readers of the file only after [`Self::flush`].
    pub fn open_write(
        file: &File,
        byte_offset: u64,
        row_stride: usize,
        count: usize,
        byte_order: ByteOrderTag,
        fields: Vec<FieldLayout>,
    ) -> io::Result<MappedElement> {
        let len = row_stride.checked_mul(count).expect("row_stride * count overflow");
        let mmap = unsafe {
            memmap2::MmapOptions::new()
                .offset(byte_offset)
                .len(len)
                .map_mut(file)?
        };
        Ok(MappedElement {
            mmap: MmapHandle::ReadWrite(mmap),
            byte_order,
            row_stride,
            count,
            fields,
        })
    }

    /// Number of rows in this mapped region.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether this mapping was opened read-write.
    pub fn is_read_write(&self) -> bool {
        matches!(self.mmap, MmapHandle::ReadWrite(_))
    }

    /// Per-row field layout, in declaration order.
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Byte width of one row.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Reads the value of one field at one row directly out of the mapped
    /// bytes, decoding for the declared byte order.
    pub fn read_field(&self, row: usize, field: &FieldLayout) -> crate::types::scalar::ScalarValue {
        let start = row * self.row_stride + field.offset;
        let end = start + field.ty.byte_width();
        self.byte_order.read(field.ty, &self.mmap.as_bytes()[start..end])
    }

    /// Writes the value of one field at one row directly into the mapped
    /// bytes. Errors if this mapping is read-only.
    pub fn write_field(
        &mut self,
        row: usize,
        field: &FieldLayout,
        value: &crate::types::scalar::ScalarValue,
    ) -> PlyResult<()> {
        let start = row * self.row_stride + field.offset;
        let width = field.ty.byte_width();
        let byte_order = self.byte_order;
        let bytes = self
            .mmap
            .as_bytes_mut()
            .ok_or_else(|| PlyError::MemoryMap("mapping is read-only".to_string()))?;
        byte_order.write(value, &mut bytes[start..start + width]);
        Ok(())
    }

    /// Flushes pending writes to the backing file. No-op for read-only
    /// mappings.
    pub fn flush(&self) -> io::Result<()> {
        if let MmapHandle::ReadWrite(m) = &self.mmap {
            m.flush()?;
        }
        Ok(())
    }
}
