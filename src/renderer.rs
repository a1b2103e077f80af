//! # Day Arc Rendering
//!
//! This module renders a resolved [`Frame`] either to an `embedded-graphics`
//! draw target (any pixel display, or a mock in tests) or as ASCII for the
//! terminal. Both draw the same elements:
//!
//! - the full wave track and the highlighted active segment
//! - one dot per prayer, larger for the current one
//! - the sun marker at the current progress
//! - `NEXT: {prayer}` with its time, `{current}: {time}`, the countdown, and a
//!   `{location} · {Live|Fallback}` status line

use crate::cycle::CycleResult;
use crate::format::{format_clock, format_countdown};
use crate::shell::{Frame, FrameSink};
use crate::wave::{self, Ellipse};
use embedded_graphics::{
    mono_font::{iso_8859_1::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Circle, Polyline, PrimitiveStyle},
    text::Text,
};

const ASCII_COLS: usize = 61;
const ASCII_ROWS: usize = 11;

/// Text shown around the arc, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub next: String,
    pub next_time: String,
    pub current: String,
    pub countdown: String,
    pub status: String,
}

impl Labels {
    pub fn for_frame(frame: &Frame) -> Self {
        let cycle = &frame.cycle;
        Self {
            next: format!("NEXT: {}", cycle.next.prayer),
            next_time: format_clock(cycle.next.date),
            current: format!(
                "{}: {}",
                cycle.current.prayer,
                format_clock(cycle.current.date)
            ),
            countdown: format!("{} remaining", format_countdown(cycle.countdown_ms)),
            status: format!("{} · {}", frame.location_label, frame.data_source),
        }
    }
}

fn to_pixel(p: &wave::Point) -> Point {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}

/// Draw the arc, markers and labels onto a binary display.
pub fn draw_arc<D>(frame: &Frame, ellipse: &Ellipse, display: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let cycle = &frame.cycle;
    let labels = Labels::for_frame(frame);
    let text_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

    // Header
    Text::new(&labels.next, Point::new(4, 10), text_style).draw(display)?;
    Text::new(&labels.next_time, Point::new(4, 22), text_style).draw(display)?;

    // Track and active segment
    let base: Vec<Point> = CycleResult::base_path(ellipse).iter().map(to_pixel).collect();
    Polyline::new(&base)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(display)?;

    let active: Vec<Point> = cycle.active_path(ellipse).iter().map(to_pixel).collect();
    Polyline::new(&active)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 3))
        .draw(display)?;

    // Prayer dots
    for point in &cycle.points {
        let diameter = if point.prayer == cycle.current.prayer { 9 } else { 5 };
        Circle::with_center(to_pixel(&point.pos), diameter)
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(display)?;
    }

    // Sun
    Circle::with_center(to_pixel(&cycle.sun_pos), 13)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(display)?;
    Circle::with_center(to_pixel(&cycle.sun_pos), 9)
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(display)?;

    // Footer
    let footer_y = (ellipse.cy + ellipse.ry).round() as i32 + 16;
    Text::new(&labels.current, Point::new(4, footer_y), text_style).draw(display)?;
    Text::new(&labels.countdown, Point::new(4, footer_y + 12), text_style).draw(display)?;
    Text::new(&labels.status, Point::new(4, footer_y + 26), text_style).draw(display)?;

    Ok(())
}

/// Render a frame as ASCII art.
pub fn ascii_frame(frame: &Frame, ellipse: &Ellipse) -> String {
    let cycle = &frame.cycle;
    let labels = Labels::for_frame(frame);
    let mut grid = vec![vec![' '; ASCII_COLS]; ASCII_ROWS];

    let to_cell = |p: &wave::Point| {
        let fx = if ellipse.rx > 0.0 {
            (p.x - (ellipse.cx - ellipse.rx)) / (2.0 * ellipse.rx)
        } else {
            0.0
        };
        let fy = if ellipse.ry > 0.0 {
            (p.y - (ellipse.cy - ellipse.ry)) / (2.0 * ellipse.ry)
        } else {
            0.5
        };
        let col = (fx * (ASCII_COLS - 1) as f64).round().clamp(0.0, (ASCII_COLS - 1) as f64);
        let row = (fy * (ASCII_ROWS - 1) as f64).round().clamp(0.0, (ASCII_ROWS - 1) as f64);
        (row as usize, col as usize)
    };

    for p in wave::path_between(0.0, 1.0, ellipse, ASCII_COLS * 2) {
        let (row, col) = to_cell(&p);
        grid[row][col] = '·';
    }

    let steps = ASCII_COLS * 2;
    for p in wave::path_between(cycle.segment_start, cycle.segment_end, ellipse, steps) {
        let (row, col) = to_cell(&p);
        grid[row][col] = '•';
    }

    for point in &cycle.points {
        let (row, col) = to_cell(&point.pos);
        grid[row][col] = if point.prayer == cycle.current.prayer { 'O' } else { 'o' };
    }

    // Mark "now" with a prominent X
    let (row, col) = to_cell(&cycle.sun_pos);
    grid[row][col] = 'X';

    let mut out = String::new();
    out.push_str(&format!("{}  {}\n\n", labels.next, labels.next_time));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&format!("{}\n{}\n{}\n", labels.current, labels.countdown, labels.status));
    out
}

/// Render a frame to the terminal.
pub fn draw_ascii(frame: &Frame, ellipse: &Ellipse) {
    println!("{}", ascii_frame(frame, ellipse));
}

/// [`FrameSink`] printing every frame as ASCII.
#[derive(Debug, Clone, Copy)]
pub struct AsciiSink {
    pub ellipse: Ellipse,
}

impl FrameSink for AsciiSink {
    fn show(&mut self, frame: &Frame) {
        draw_ascii(frame, &self.ellipse);
    }
}
