use std::{fmt, path::Path};

use anyhow::Context;
use image::{ImageBuffer, Rgba, RgbaImage};
use nalgebra::{Point2, Vector2};

use crate::{rect::Rect, Color, Resolution};

/// Number of channels stored per pixel (RGBA).
pub const CHANNELS: usize = 4;

/// An 8-bit sRGB image with alpha channel.
#[derive(Clone)]
pub struct Image {
    buf: RgbaImage,
}

impl Image {
    /// Creates an empty image of a specified size.
    ///
    /// The image will start out black and fully transparent.
    pub fn new(res: impl Into<Resolution>) -> Self {
        let res = res.into();
        Self {
            buf: ImageBuffer::new(res.width(), res.height()),
        }
    }

    /// Returns a new [`Image`] of the given size, with every pixel initialized to `color`.
    pub fn filled(res: impl Into<Resolution>, color: Color) -> Self {
        let mut this = Self::new(res);
        this.clear(color);
        this
    }

    /// Creates an [`Image`] by computing the color of every pixel with a closure.
    pub fn from_fn(res: impl Into<Resolution>, mut f: impl FnMut(u32, u32) -> Color) -> Self {
        let res = res.into();
        Self {
            buf: ImageBuffer::from_fn(res.width(), res.height(), |x, y| Rgba(f(x, y).0)),
        }
    }

    /// Creates an [`Image`] from raw, preexisting RGBA pixel data.
    ///
    /// `buf` needs to contain interleaved `r g b a` bytes. Its length needs to be exactly
    /// `width * height * 4`, or this function will panic.
    pub fn from_rgba8(res: impl Into<Resolution>, buf: &[u8]) -> Self {
        let res = res.into();
        let expected_size = res.num_pixels() as usize * CHANNELS;
        assert_eq!(
            expected_size,
            buf.len(),
            "incorrect buffer size {} for {} image (expected {} bytes)",
            buf.len(),
            res,
            expected_size,
        );

        Self {
            buf: ImageBuffer::from_raw(res.width(), res.height(), buf.to_vec())
                .expect("buffer size was checked above"),
        }
    }

    /// Loads an image from the filesystem.
    ///
    /// The format is determined from the file extension (JPEG and PNG are supported).
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let buf = image::open(path)
            .with_context(|| format!("failed to load image '{}'", path.display()))?
            .to_rgba8();
        log::trace!("loaded {}x{} image from {}", buf.width(), buf.height(), path.display());
        Ok(Self { buf })
    }

    /// Saves an image to the file system.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg` or `png`).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        self.buf
            .save(path)
            .with_context(|| format!("failed to save image to '{}'", path.display()))
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns the tensor shape of this image as `(batch, height, width, channels)`.
    #[inline]
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height() as usize, self.width() as usize, CHANNELS]
    }

    /// Returns a [`Rect`] covering this image.
    ///
    /// The rectangle will be positioned at `(0, 0)` and have the width and height of the image.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width().into(), self.height().into())
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf[(x, y)].0)
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgba(color.0);
    }

    /// Clears the image, setting every pixel value to `color`.
    pub fn clear(&mut self, color: Color) {
        self.buf.pixels_mut().for_each(|pix| pix.0 = color.0);
    }

    /// Returns the raw interleaved RGBA data of this image.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }

    /// Bilinearly samples the image at continuous coordinates.
    ///
    /// Pixel `(x, y)` has its center at `(x + 0.5, y + 0.5)`. Returns [`None`] if `pos` lies
    /// outside of the image. Samples within half a pixel of the border replicate the edge pixels.
    fn sample(&self, pos: Point2<f64>) -> Option<Color> {
        if !self.rect().contains_point(pos) || self.resolution().is_empty() {
            return None;
        }

        let max_x = i64::from(self.width()) - 1;
        let max_y = i64::from(self.height()) - 1;
        let fx = pos.x - 0.5;
        let fy = pos.y - 0.5;
        let (x0, y0) = (fx.floor(), fy.floor());
        let (tx, ty) = (fx - x0, fy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let mut acc = [0.0f32; 4];
        for (dx, dy, weight) in [
            (0, 0, (1.0 - tx) * (1.0 - ty)),
            (1, 0, tx * (1.0 - ty)),
            (0, 1, (1.0 - tx) * ty),
            (1, 1, tx * ty),
        ] {
            if weight == 0.0 {
                continue;
            }
            let x = (x0 + dx).clamp(0, max_x) as u32;
            let y = (y0 + dy).clamp(0, max_y) as u32;
            for (acc, c) in acc.iter_mut().zip(self.get(x, y).0) {
                *acc += f32::from(c) * weight as f32;
            }
        }

        Some(Color::from_f32(acc))
    }

    /// Rotates the whole image about a point.
    ///
    /// `center` is given relative to the image size (`[0.5, 0.5]` is the middle of the image).
    /// Every output pixel `p` is sampled from the source location obtained by rotating `p` by
    /// `radians` about `center` (using `[[cos, -sin], [sin, cos]]`), so the image *content* turns
    /// by `-radians`. Pixels sampled from outside the source image are set to `fill`.
    ///
    /// The returned image has the same resolution as `self`.
    pub fn rotate_with_offset(&self, radians: f64, center: [f64; 2], fill: Color) -> Image {
        let pivot = Point2::new(
            center[0] * f64::from(self.width()),
            center[1] * f64::from(self.height()),
        );
        let (sin, cos) = radians.sin_cos();

        Image::from_fn(self.resolution(), |x, y| {
            let rel = Vector2::new(f64::from(x) + 0.5, f64::from(y) + 0.5) - pivot.coords;
            let src = Point2::new(
                rel.x * cos - rel.y * sin + pivot.x,
                rel.x * sin + rel.y * cos + pivot.y,
            );
            self.sample(src).unwrap_or(fill)
        })
    }

    /// Cuts the area described by `rect` out of the image and resamples it to `res`.
    ///
    /// `rect` may extend past the image bounds (or lie outside of it entirely). Those areas are
    /// filled with [`Color::NONE`].
    pub fn crop_and_resize(&self, rect: &Rect, res: impl Into<Resolution>) -> Image {
        self.crop_and_resize_impl(rect, res.into())
    }

    fn crop_and_resize_impl(&self, rect: &Rect, res: Resolution) -> Image {
        let step = Vector2::new(
            rect.width() / f64::from(res.width()),
            rect.height() / f64::from(res.height()),
        );
        let start = rect.start();

        Image::from_fn(res, |x, y| {
            let src = Point2::new(
                start.x + (f64::from(x) + 0.5) * step.x,
                start.y + (f64::from(y) + 0.5) * step.y,
            );
            self.sample(src).unwrap_or(Color::NONE)
        })
    }

    /// Stretches the whole image to a new resolution.
    pub fn resize(&self, res: impl Into<Resolution>) -> Image {
        self.crop_and_resize_impl(&self.rect(), res.into())
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({})", self.resolution())
    }
}
