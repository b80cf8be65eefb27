use imageproc::{point::Point, rect::Rect};
use serde::Serialize;

use crate::geometry::{get_contour_bounding_rect, Contour};

/// Four corners of a page. Only [`Quadrilateral::ordered`] guarantees the
/// top-left, top-right, bottom-right, bottom-left order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub corners: [Point<f32>; 4],
}

impl Quadrilateral {
    pub fn new(corners: [Point<f32>; 4]) -> Self {
        Self { corners }
    }

    pub fn from_contour_points(points: &[Point<i32>]) -> Option<Self> {
        match points {
            [a, b, c, d] => Some(Self::new(
                [a, b, c, d].map(|p| Point::new(p.x as f32, p.y as f32)),
            )),
            _ => None,
        }
    }

    /// Puts the corners in canonical order: top-left, top-right,
    /// bottom-right, bottom-left.
    pub fn ordered(&self) -> Self {
        Self::new(crate::rectify::order_points(self.corners))
    }

    pub fn top_left(&self) -> Point<f32> {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point<f32> {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point<f32> {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point<f32> {
        self.corners[3]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Size<T> {
    pub width: T,
    pub height: T,
}

/// Ink measured inside a bubble's contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fill {
    /// Foreground pixels under the contour mask.
    pub count: u32,
    /// Pixels in the contour mask.
    pub area: u32,
}

impl Fill {
    pub fn ratio(&self) -> f32 {
        if self.area == 0 {
            0.0
        } else {
            self.count as f32 / self.area as f32
        }
    }
}

/// A contour that passed the bubble shape filter.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleCandidate {
    pub contour: Contour,
    pub bounds: Rect,
    pub fill: Option<Fill>,
}

impl BubbleCandidate {
    pub fn new(contour: Contour) -> Option<Self> {
        let bounds = get_contour_bounding_rect(&contour)?;
        Some(Self {
            contour,
            bounds,
            fill: None,
        })
    }

    pub fn fill_count(&self) -> u32 {
        self.fill.map_or(0, |fill| fill.count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "choice")]
pub enum DetectedAnswer {
    Marked(usize),
    Unanswered,
}

impl DetectedAnswer {
    pub fn choice(&self) -> Option<usize> {
        match self {
            DetectedAnswer::Marked(choice) => Some(*choice),
            DetectedAnswer::Unanswered => None,
        }
    }
}

/// One question's bubbles ordered left to right, with the detected answer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionGroup {
    pub bubbles: Vec<BubbleCandidate>,
    pub answer: DetectedAnswer,
}
