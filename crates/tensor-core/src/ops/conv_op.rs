// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 2-D convolution (NCHW) via im2col + matmul.

use super::matmul_op::matmul_f32;
use super::relu_op::relu_in_place;
use crate::{Shape, Tensor, TensorError};

/// Stride and zero-padding of a square-kernel convolution or pooling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Conv2dParams {
    pub stride: usize,
    pub padding: usize,
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Self {
            stride: 1,
            padding: 0,
        }
    }
}

impl Conv2dParams {
    pub fn new(stride: usize, padding: usize) -> Self {
        Self { stride, padding }
    }

    /// Output spatial extent for an `h × w` input and `kh × kw` window.
    pub fn output_hw(
        &self,
        op: &'static str,
        h: usize,
        w: usize,
        kh: usize,
        kw: usize,
    ) -> Result<(usize, usize), TensorError> {
        if self.stride == 0 {
            return Err(TensorError::InvalidGeometry {
                op,
                detail: "stride must be positive".into(),
            });
        }
        let ph = h + 2 * self.padding;
        let pw = w + 2 * self.padding;
        if ph < kh || pw < kw {
            return Err(TensorError::InvalidGeometry {
                op,
                detail: format!("window {kh}x{kw} larger than padded input {ph}x{pw}"),
            });
        }
        Ok(((ph - kh) / self.stride + 1, (pw - kw) / self.stride + 1))
    }
}

/// Gradients produced by [`conv2d_backward`].
#[derive(Debug)]
pub struct Conv2dGrads {
    pub input: Tensor,
    pub weight: Tensor,
    pub bias: Option<Tensor>,
}

struct Geometry {
    n: usize,
    c: usize,
    h: usize,
    w: usize,
    o: usize,
    kh: usize,
    kw: usize,
    oh: usize,
    ow: usize,
}

impl Geometry {
    fn resolve(
        op: &'static str,
        input: &Tensor,
        weight: &Tensor,
        params: Conv2dParams,
    ) -> Result<Self, TensorError> {
        input.ensure_rank(op, 4)?;
        weight.ensure_rank(op, 4)?;
        input.ensure_same_device(op, weight)?;
        let [n, c, h, w] = dims4(input.shape());
        let [o, wc, kh, kw] = dims4(weight.shape());
        if wc != c {
            return Err(TensorError::ShapeMismatch {
                op,
                lhs: input.shape().clone(),
                rhs: weight.shape().clone(),
            });
        }
        let (oh, ow) = params.output_hw(op, h, w, kh, kw)?;
        Ok(Self {
            n,
            c,
            h,
            w,
            o,
            kh,
            kw,
            oh,
            ow,
        })
    }

    fn patch_len(&self) -> usize {
        self.c * self.kh * self.kw
    }

    fn out_pixels(&self) -> usize {
        self.oh * self.ow
    }
}

/// Convolves `input` `[N, C, H, W]` with `weight` `[O, C, KH, KW]`, adding
/// `bias` `[O]` when given. With `fuse_relu` the activation is applied in
/// the same pass over the output buffer.
///
/// Returns an `f32` tensor `[N, O, OH, OW]` on the input's device.
pub fn conv2d(
    input: &Tensor,
    weight: &Tensor,
    bias: Option<&Tensor>,
    params: Conv2dParams,
    fuse_relu: bool,
) -> Result<Tensor, TensorError> {
    let g = Geometry::resolve("conv2d", input, weight, params)?;
    if let Some(b) = bias {
        check_bias("conv2d", b, g.o)?;
    }

    let x = input.as_f32();
    let wt = weight.as_f32();
    let bias_values = bias.map(|b| b.as_f32());

    let sample_in = g.c * g.h * g.w;
    let sample_out = g.o * g.out_pixels();
    let mut out = vec![0.0f32; g.n * sample_out];
    let mut cols = vec![0.0f32; g.patch_len() * g.out_pixels()];

    for s in 0..g.n {
        im2col(&x[s * sample_in..(s + 1) * sample_in], &g, params, &mut cols);
        let dst = &mut out[s * sample_out..(s + 1) * sample_out];
        matmul_f32(&wt, &cols, dst, g.o, g.patch_len(), g.out_pixels());
        if let Some(b) = &bias_values {
            for (oc, row) in dst.chunks_mut(g.out_pixels()).enumerate() {
                row.iter_mut().for_each(|v| *v += b[oc]);
            }
        }
        if fuse_relu {
            relu_in_place(dst);
        }
    }

    Ok(Tensor::from_vec(Shape::nchw(g.n, g.o, g.oh, g.ow), out)?.to_device(input.device()))
}

/// Backward pass of [`conv2d`] (without a fused activation).
///
/// `grad_output` is `[N, O, OH, OW]`. Returns gradients for the input,
/// the weight and, when `with_bias`, the bias.
pub fn conv2d_backward(
    input: &Tensor,
    weight: &Tensor,
    grad_output: &Tensor,
    params: Conv2dParams,
    with_bias: bool,
) -> Result<Conv2dGrads, TensorError> {
    let g = Geometry::resolve("conv2d_backward", input, weight, params)?;
    let expected = Shape::nchw(g.n, g.o, g.oh, g.ow);
    if grad_output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "conv2d_backward",
            lhs: expected,
            rhs: grad_output.shape().clone(),
        });
    }

    let x = input.as_f32();
    let wt = weight.as_f32();
    let dy = grad_output.as_f32();

    let patch = g.patch_len();
    let pixels = g.out_pixels();
    let sample_in = g.c * g.h * g.w;
    let sample_out = g.o * pixels;

    let wt_t = transpose(&wt, g.o, patch);
    let mut dx = vec![0.0f32; g.n * sample_in];
    let mut dw = vec![0.0f32; g.o * patch];
    let mut db = vec![0.0f32; g.o];

    let mut cols = vec![0.0f32; patch * pixels];
    let mut dcols = vec![0.0f32; patch * pixels];
    let mut dw_sample = vec![0.0f32; g.o * patch];

    for s in 0..g.n {
        let dy_s = &dy[s * sample_out..(s + 1) * sample_out];

        im2col(&x[s * sample_in..(s + 1) * sample_in], &g, params, &mut cols);
        let cols_t = transpose(&cols, patch, pixels);
        matmul_f32(dy_s, &cols_t, &mut dw_sample, g.o, pixels, patch);
        dw.iter_mut().zip(&dw_sample).for_each(|(a, b)| *a += b);

        if with_bias {
            for (oc, row) in dy_s.chunks(pixels).enumerate() {
                db[oc] += row.iter().sum::<f32>();
            }
        }

        matmul_f32(&wt_t, dy_s, &mut dcols, patch, g.o, pixels);
        col2im(&dcols, &g, params, &mut dx[s * sample_in..(s + 1) * sample_in]);
    }

    let device = input.device();
    Ok(Conv2dGrads {
        input: Tensor::from_vec(input.shape().clone(), dx)?.to_device(device),
        weight: Tensor::from_vec(weight.shape().clone(), dw)?.to_device(device),
        bias: if with_bias {
            Some(Tensor::from_vec(Shape::vector(g.o), db)?.to_device(device))
        } else {
            None
        },
    })
}

pub(crate) fn dims4(shape: &Shape) -> [usize; 4] {
    let d = shape.dims();
    [d[0], d[1], d[2], d[3]]
}

fn check_bias(op: &'static str, bias: &Tensor, out_channels: usize) -> Result<(), TensorError> {
    if bias.shape() != &Shape::vector(out_channels) {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: Shape::vector(out_channels),
            rhs: bias.shape().clone(),
        });
    }
    Ok(())
}

/// Unfolds one `[C, H, W]` sample into `[C*KH*KW, OH*OW]` columns.
fn im2col(x: &[f32], g: &Geometry, p: Conv2dParams, cols: &mut [f32]) {
    let pixels = g.out_pixels();
    for ci in 0..g.c {
        for ki in 0..g.kh {
            for kj in 0..g.kw {
                let row = (ci * g.kh + ki) * g.kw + kj;
                let dst = &mut cols[row * pixels..(row + 1) * pixels];
                for oy in 0..g.oh {
                    let iy = (oy * p.stride + ki) as isize - p.padding as isize;
                    for ox in 0..g.ow {
                        let ix = (ox * p.stride + kj) as isize - p.padding as isize;
                        dst[oy * g.ow + ox] = if iy >= 0
                            && ix >= 0
                            && (iy as usize) < g.h
                            && (ix as usize) < g.w
                        {
                            x[(ci * g.h + iy as usize) * g.w + ix as usize]
                        } else {
                            0.0
                        };
                    }
                }
            }
        }
    }
}

/// Inverse of [`im2col`]: accumulates column gradients back into `[C, H, W]`.
fn col2im(cols: &[f32], g: &Geometry, p: Conv2dParams, dx: &mut [f32]) {
    let pixels = g.out_pixels();
    for ci in 0..g.c {
        for ki in 0..g.kh {
            for kj in 0..g.kw {
                let row = (ci * g.kh + ki) * g.kw + kj;
                let src = &cols[row * pixels..(row + 1) * pixels];
                for oy in 0..g.oh {
                    let iy = (oy * p.stride + ki) as isize - p.padding as isize;
                    if iy < 0 || iy as usize >= g.h {
                        continue;
                    }
                    for ox in 0..g.ow {
                        let ix = (ox * p.stride + kj) as isize - p.padding as isize;
                        if ix < 0 || ix as usize >= g.w {
                            continue;
                        }
                        dx[(ci * g.h + iy as usize) * g.w + ix as usize] += src[oy * g.ow + ox];
                    }
                }
            }
        }
    }
}

fn transpose(src: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = src[r * cols + c];
        }
    }
    out
}
