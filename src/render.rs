use crate::grid::Grid;
use crate::protocol::{Cell, CreepId, TowerId, TowerSnapshot};
use crate::state::Creep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Plain,
    Hovered,
}

/// One attacker/target pair from the attack map, with whatever positions
/// the client knows for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub attacker: TowerId,
    pub target: CreepId,
    pub from: Option<Cell>,
    pub to: Option<(f32, f32)>,
}

/// Drawing primitives the scheduler calls each frame. Positions are in
/// grid cells; implementations decide the pixels.
pub trait DrawSurface {
    fn begin_frame(&mut self);
    fn draw_cell(&mut self, cell: Cell, style: CellStyle);
    fn draw_tower(&mut self, tower: &TowerSnapshot);
    fn draw_creep(&mut self, creep: &Creep);
    fn draw_shot(&mut self, shot: &Shot);
    fn end_frame(&mut self);
}

// --- PIXEL BUFFER ENGINE ---

type Rgb = (u8, u8, u8);

const BACKGROUND: Rgb = (20, 20, 20);
const GRID_LINE: Rgb = (60, 60, 60);
const HOVER_FILL: Rgb = (45, 70, 45);
const SHOT: Rgb = (255, 255, 255);
const TOWER_COLORS: [Rgb; 3] = [(139, 90, 43), (220, 70, 20), (120, 200, 255)];
const CREEP_COLORS: [Rgb; 2] = [(255, 215, 0), (150, 40, 160)];
const UNKNOWN_KIND: Rgb = (128, 128, 128);

pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> PixelBuffer {
        let size = (width * height * 4) as usize;
        PixelBuffer { width, height, pixels: vec![0; size] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel_at(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        Some((self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]))
    }

    fn clear(&mut self, (r, g, b): Rgb) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, 255]);
        }
    }

    fn pixel(&mut self, x: i32, y: i32, (r, g, b): Rgb) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = ((y * self.width as i32 + x) * 4) as usize;
        self.pixels[idx..idx + 4].copy_from_slice(&[r, g, b, 255]);
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        // Clip to screen
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = (x + w).min(self.width as i32);
        let end_y = (y + h).min(self.height as i32);

        for iy in start_y..end_y {
            for ix in start_x..end_x {
                self.pixel(ix, iy, color);
            }
        }
    }

    fn rect_outline(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        self.rect(x, y, w, 1, color);
        self.rect(x, y + h - 1, w, 1, color);
        self.rect(x, y, 1, h, color);
        self.rect(x + w - 1, y, 1, h, color);
    }

    fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        let mut x = x0;
        let mut y = y0;
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            self.pixel(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Clips a segment to the buffer, returning integer endpoints that lie
    /// inside it. `None` when the segment misses the buffer or is not finite.
    fn clip_segment(&self, (x0, y0): (f32, f32), (x1, y1): (f32, f32)) -> Option<((i32, i32), (i32, i32))> {
        let (dx, dy) = (x1 - x0, y1 - y0);
        if ![x0, y0, dx, dy].iter().all(|v| v.is_finite()) || self.width == 0 || self.height == 0 {
            return None;
        }
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;

        // Liang-Barsky
        let (mut t0, mut t1) = (0.0f32, 1.0f32);
        for (p, q) in [(-dx, x0), (dx, max_x - x0), (-dy, y0), (dy, max_y - y0)] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                if t > t1 {
                    return None;
                }
                t0 = t0.max(t);
            } else if t < t0 {
                return None;
            } else {
                t1 = t1.min(t);
            }
        }

        let at = |t: f32| {
            (
                (x0 + t * dx).round().clamp(0.0, max_x) as i32,
                (y0 + t * dy).round().clamp(0.0, max_y) as i32,
            )
        };
        Some((at(t0), at(t1)))
    }
}

/// Software surface: rasterizes into a `PixelBuffer` that the browser glue
/// blits onto the canvas after each frame.
pub struct PixelSurface {
    buffer: PixelBuffer,
    cell_w: f32,
    cell_h: f32,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32, grid: &Grid) -> PixelSurface {
        let (cell_w, cell_h) = grid.cell_size();
        PixelSurface { buffer: PixelBuffer::new(width, height), cell_w, cell_h }
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    fn cell_rect(&self, cell: Cell) -> (i32, i32, i32, i32) {
        let x = (cell.x as f32 * self.cell_w) as i32;
        let y = (cell.y as f32 * self.cell_h) as i32;
        (x, y, self.cell_w.ceil() as i32, self.cell_h.ceil() as i32)
    }

    fn center(&self, x: f32, y: f32) -> (f32, f32) {
        ((x + 0.5) * self.cell_w, (y + 0.5) * self.cell_h)
    }

    /// Skips anything whose center lies more than a cell off the canvas.
    fn square(&mut self, (cx, cy): (f32, f32), fraction: f32, color: Rgb) {
        let in_x = cx >= -self.cell_w && cx <= self.buffer.width as f32 + self.cell_w;
        let in_y = cy >= -self.cell_h && cy <= self.buffer.height as f32 + self.cell_h;
        if !(in_x && in_y) {
            return;
        }
        let w = (self.cell_w * fraction) as i32;
        let h = (self.cell_h * fraction) as i32;
        self.buffer.rect(cx as i32 - w / 2, cy as i32 - h / 2, w, h, color);
    }
}

fn palette(colors: &[Rgb], kind: Option<u32>) -> Rgb {
    kind.and_then(|k| colors.get(k as usize)).copied().unwrap_or(UNKNOWN_KIND)
}

impl DrawSurface for PixelSurface {
    fn begin_frame(&mut self) {
        self.buffer.clear(BACKGROUND);
    }

    fn draw_cell(&mut self, cell: Cell, style: CellStyle) {
        let (x, y, w, h) = self.cell_rect(cell);
        if style == CellStyle::Hovered {
            self.buffer.rect(x, y, w, h, HOVER_FILL);
        }
        self.buffer.rect_outline(x, y, w, h, GRID_LINE);
    }

    fn draw_tower(&mut self, tower: &TowerSnapshot) {
        let center = self.center(tower.x as f32, tower.y as f32);
        self.square(center, 0.7, palette(&TOWER_COLORS, tower.kind));
    }

    fn draw_creep(&mut self, creep: &Creep) {
        let center = self.center(creep.x, creep.y);
        self.square(center, 0.4, palette(&CREEP_COLORS, creep.kind));
    }

    fn draw_shot(&mut self, shot: &Shot) {
        if let (Some(from), Some(to)) = (shot.from, shot.to) {
            let start = self.center(from.x as f32, from.y as f32);
            let end = self.center(to.0, to.1);
            if let Some(((x0, y0), (x1, y1))) = self.buffer.clip_segment(start, end) {
                self.buffer.line(x0, y0, x1, y1, SHOT);
            }
        }
    }

    fn end_frame(&mut self) {}
}
