//! Embedded texture records and pixel materialization.
//!
//! A [`Texture`] stores raw (optionally zlib-compressed) pixel bytes plus
//! enough layout metadata to rebuild an RGBA image. Image decode/encode is
//! delegated to the `image` crate, compression to `flate2`.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;

use crate::error::{Error, Result};

/// Channel layout of the stored payload (u16 on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum TextureFormat {
    #[default]
    R = 0,
    RInteger = 1,
    Rg = 2,
    RgInteger = 3,
    Rgb = 4,
    RgbInteger = 5,
    Rgba = 6,
    RgbaInteger = 7,
    Rgbm = 8,
    DepthComponent = 9,
    DepthStencil = 10,
    Alpha = 11,
}

impl TextureFormat {
    /// Bytes per pixel for the formats we can materialize into RGBA.
    fn pixel_size(self) -> Option<usize> {
        match self {
            TextureFormat::R => Some(1),
            TextureFormat::Rgb => Some(3),
            TextureFormat::Rgba => Some(4),
            _ => None,
        }
    }
}

impl TryFrom<u16> for TextureFormat {
    type Error = Error;

    fn try_from(raw: u16) -> Result<Self> {
        match raw {
            0 => Ok(TextureFormat::R),
            1 => Ok(TextureFormat::RInteger),
            2 => Ok(TextureFormat::Rg),
            3 => Ok(TextureFormat::RgInteger),
            4 => Ok(TextureFormat::Rgb),
            5 => Ok(TextureFormat::RgbInteger),
            6 => Ok(TextureFormat::Rgba),
            7 => Ok(TextureFormat::RgbaInteger),
            8 => Ok(TextureFormat::Rgbm),
            9 => Ok(TextureFormat::DepthComponent),
            10 => Ok(TextureFormat::DepthStencil),
            11 => Ok(TextureFormat::Alpha),
            other => Err(Error::UnknownTextureFormat(other)),
        }
    }
}

/// Component type of one channel (u16 on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum PixelType {
    #[default]
    UnsignedByte = 0,
    Byte = 1,
    UnsignedShort = 2,
    Short = 3,
    UnsignedInt = 4,
    Int = 5,
    Half = 6,
    Float = 7,
}

impl TryFrom<u16> for PixelType {
    type Error = Error;

    fn try_from(raw: u16) -> Result<Self> {
        match raw {
            0 => Ok(PixelType::UnsignedByte),
            1 => Ok(PixelType::Byte),
            2 => Ok(PixelType::UnsignedShort),
            3 => Ok(PixelType::Short),
            4 => Ok(PixelType::UnsignedInt),
            5 => Ok(PixelType::Int),
            6 => Ok(PixelType::Half),
            7 => Ok(PixelType::Float),
            other => Err(Error::UnknownPixelType(other)),
        }
    }
}

/// Payload compression flag (u16 on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum TextureCompression {
    #[default]
    None = 0,
    Zlib = 1,
}

impl TryFrom<u16> for TextureCompression {
    type Error = Error;

    fn try_from(raw: u16) -> Result<Self> {
        match raw {
            0 => Ok(TextureCompression::None),
            1 => Ok(TextureCompression::Zlib),
            other => Err(Error::UnknownCompression(other)),
        }
    }
}

/// An embedded texture. `id` is scoped to one mesh and drives
/// deduplication when the mesh is exported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Texture {
    pub id: i32,
    pub name: String,
    pub size: [u64; 2],
    pub format: TextureFormat,
    pub pixel_type: PixelType,
    pub compression: TextureCompression,
    pub data: Vec<u8>,
    pub repeated: bool,
}

impl Texture {
    /// Capture an image as a zlib-compressed RGBA8 texture.
    pub fn from_image(img: &image::DynamicImage, name: &str, repeated: bool) -> Texture {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Texture {
            id: 0,
            name: name.to_string(),
            size: [u64::from(width), u64::from(height)],
            format: TextureFormat::Rgba,
            pixel_type: PixelType::UnsignedByte,
            compression: TextureCompression::Zlib,
            data: compress_payload(rgba.as_raw()),
            repeated,
        }
    }

    /// Materialize the payload as an RGBA image, decompressing when
    /// flagged. `flip_y` mirrors the rows for bottom-up consumers.
    pub fn decode_pixels(&self, flip_y: bool) -> Result<RgbaImage> {
        let width = self.size[0] as usize;
        let height = self.size[1] as usize;
        let pixel_size = self
            .format
            .pixel_size()
            .ok_or(Error::UndecodableTexture(self.format))?;

        let data = match self.compression {
            TextureCompression::Zlib => decompress_payload(&self.data)?,
            TextureCompression::None => self.data.clone(),
        };

        let expected = width * height * pixel_size;
        if data.len() < expected {
            return Err(Error::ShortTexturePayload {
                expected,
                actual: data.len(),
            });
        }

        let mut img = RgbaImage::new(width as u32, height as u32);
        for row in 0..height {
            for col in 0..width {
                let p = (row * width + col) * pixel_size;
                let rgba = match pixel_size {
                    4 => [data[p], data[p + 1], data[p + 2], data[p + 3]],
                    3 => [data[p], data[p + 1], data[p + 2], 255],
                    _ => [data[p], data[p], data[p], 255],
                };
                let y = if flip_y { height - row - 1 } else { row };
                img.put_pixel(col as u32, y as u32, image::Rgba(rgba));
            }
        }
        Ok(img)
    }
}

/// Decode any supported image payload (PNG/JPEG/GIF/BMP/TIFF) into a
/// texture record.
pub fn texture_from_bytes(name: &str, bytes: &[u8], repeated: bool) -> Result<Texture> {
    let img = image::load_from_memory(bytes)?;
    Ok(Texture::from_image(&img, name, repeated))
}

/// zlib-compress a raw pixel payload.
pub fn compress_payload(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    // Writing into a Vec cannot fail.
    encoder.write_all(raw).expect("write to vec");
    encoder.finish().expect("finish zlib stream")
}

/// Inverse of [`compress_payload`].
pub fn decompress_payload(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;
    Ok(raw)
}
