use std::time::Instant;

use serde::Serialize;

/// One captured image, tightly packed 8-bit RGB.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgb: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgb,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(vec![0; width as usize * height as usize * 3], width, height)
    }

    pub fn is_well_formed(&self) -> bool {
        self.rgb.len() == self.width as usize * self.height as usize * 3
    }
}

/// Normalized landmark position (x and y in `0.0..=1.0` of the frame).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn to_pixels(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

/// Hand landmark indices shared with the landmark model.
#[allow(dead_code)]
pub mod hand {
    pub const WRIST: usize = 0;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;

    pub const NUM_LANDMARKS: usize = 21;

    /// (tip, pip) pairs for index, middle, ring and pinky.
    pub const FINGERS: [(usize, usize); 4] = [
        (INDEX_TIP, INDEX_PIP),
        (MIDDLE_TIP, MIDDLE_PIP),
        (RING_TIP, RING_PIP),
        (PINKY_TIP, PINKY_PIP),
    ];

    pub const CONNECTIONS: &[(usize, usize)] = &[
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 4),
        (0, 5),
        (5, 6),
        (6, 7),
        (7, 8),
        (0, 9),
        (9, 10),
        (10, 11),
        (11, 12),
        (0, 13),
        (13, 14),
        (14, 15),
        (15, 16),
        (0, 17),
        (17, 18),
        (18, 19),
        (19, 20),
        (5, 9),
        (9, 13),
        (13, 17),
    ];
}

/// Ordered landmarks for one detected hand or face.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LandmarkSet {
    pub points: Vec<Landmark>,
    pub confidence: f32,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self {
            points,
            confidence: 1.0,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn is_full_hand(&self) -> bool {
        self.points.len() >= hand::NUM_LANDMARKS
    }

    pub fn projected(&self, width: u32, height: u32) -> Vec<(f32, f32)> {
        self.points
            .iter()
            .map(|p| p.to_pixels(width, height))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
    Unknown,
}

impl Move {
    pub const PLAYABLE: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    pub fn is_playable(&self) -> bool {
        !matches!(self, Move::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Move::Rock => "Rock",
            Move::Paper => "Paper",
            Move::Scissors => "Scissors",
            Move::Unknown => "Unknown",
        }
    }

    /// The move this one defeats; `Unknown` defeats nothing.
    pub fn beats(&self) -> Option<Move> {
        match self {
            Move::Rock => Some(Move::Scissors),
            Move::Paper => Some(Move::Rock),
            Move::Scissors => Some(Move::Paper),
            Move::Unknown => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Winner {
    Player,
    Computer,
    Tie,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShapeLabel {
    Line,
    Arc,
    Circle,
    Zigzag,
}

impl ShapeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeLabel::Line => "LINE",
            ShapeLabel::Arc => "ARC",
            ShapeLabel::Circle => "CIRCLE",
            ShapeLabel::Zigzag => "ZIGZAG",
        }
    }

    /// Epic weapon associated with the drawn shape: (name, figure, description).
    pub fn lore(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            ShapeLabel::Line => ("Nandaka", "Vishnu", "The divine sword of preservation"),
            ShapeLabel::Arc => ("Gandiva", "Arjuna", "The celestial bow of flawless aim"),
            ShapeLabel::Circle => ("Sudarshan Chakra", "Krishna", "The eternal spinning discus"),
            ShapeLabel::Zigzag => ("Trishul", "Shiva", "Weapon of cosmic balance"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeResult {
    pub label: ShapeLabel,
    pub confidence: f32,
}
