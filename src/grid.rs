use crate::config::{CanvasSize, GridSize};
use crate::protocol::Cell;
use crate::render::{CellStyle, DrawSurface};

/// Maps canvas pixels to logical cells and remembers the hovered cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cell_width: f32,
    cell_height: f32,
    // Page position of the canvas' top-left corner.
    offset: (f32, f32),
    hovered: Option<Cell>,
}

impl Grid {
    pub fn new(size: GridSize, canvas: CanvasSize) -> Grid {
        Grid {
            columns: size.columns,
            rows: size.rows,
            cell_width: canvas.width as f32 / size.columns as f32,
            cell_height: canvas.height as f32 / size.rows as f32,
            offset: (0.0, 0.0),
            hovered: None,
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_size(&self) -> (f32, f32) {
        (self.cell_width, self.cell_height)
    }

    pub fn set_offset(&mut self, left: f32, top: f32) {
        self.offset = (left, top);
    }

    pub fn hovered(&self) -> Option<Cell> {
        self.hovered
    }

    /// Page coordinates to a cell; `None` outside the board.
    pub fn pixel_to_cell(&self, page_x: f32, page_y: f32) -> Option<Cell> {
        let x = page_x - self.offset.0;
        let y = page_y - self.offset.1;
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let column = (x / self.cell_width).floor() as u32;
        let row = (y / self.cell_height).floor() as u32;
        if column >= self.columns || row >= self.rows {
            return None;
        }
        Some(Cell::new(column, row))
    }

    pub fn pointer_moved(&mut self, page_x: f32, page_y: f32) {
        self.hovered = self.pixel_to_cell(page_x, page_y);
    }

    /// Top-left pixel of a cell, relative to the canvas.
    pub fn cell_origin(&self, cell: Cell) -> (f32, f32) {
        (cell.x as f32 * self.cell_width, cell.y as f32 * self.cell_height)
    }

    pub fn draw(&self, surface: &mut dyn DrawSurface) {
        for y in 0..self.rows {
            for x in 0..self.columns {
                let cell = Cell::new(x, y);
                let style = if self.hovered == Some(cell) {
                    CellStyle::Hovered
                } else {
                    CellStyle::Plain
                };
                surface.draw_cell(cell, style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Grid {
        Grid::new(GridSize { columns: 16, rows: 12 }, CanvasSize { width: 800, height: 600 })
    }

    #[test]
    fn maps_pixels_to_cells() {
        let grid = board();
        assert_eq!(grid.cell_size(), (50.0, 50.0));
        assert_eq!(grid.pixel_to_cell(0.0, 0.0), Some(Cell::new(0, 0)));
        assert_eq!(grid.pixel_to_cell(175.0, 220.0), Some(Cell::new(3, 4)));
        assert_eq!(grid.pixel_to_cell(799.9, 599.9), Some(Cell::new(15, 11)));
        assert_eq!(grid.pixel_to_cell(800.0, 10.0), None);
        assert_eq!(grid.pixel_to_cell(-1.0, 10.0), None);
    }

    #[test]
    fn offset_is_subtracted() {
        let mut grid = board();
        grid.set_offset(100.0, 40.0);
        assert_eq!(grid.pixel_to_cell(275.0, 260.0), Some(Cell::new(3, 4)));
        assert_eq!(grid.pixel_to_cell(50.0, 50.0), None);
    }

    #[test]
    fn hover_follows_pointer() {
        let mut grid = board();
        grid.pointer_moved(60.0, 60.0);
        assert_eq!(grid.hovered(), Some(Cell::new(1, 1)));
        grid.pointer_moved(9000.0, 60.0);
        assert_eq!(grid.hovered(), None);
    }

    #[test]
    fn cell_origin_is_inverse_of_lookup() {
        let grid = board();
        let (x, y) = grid.cell_origin(Cell::new(3, 4));
        assert_eq!((x, y), (150.0, 200.0));
        assert_eq!(grid.pixel_to_cell(x, y), Some(Cell::new(3, 4)));
    }
}
