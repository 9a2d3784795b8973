use crate::types::{LandmarkSet, Move, Winner, hand};

/// Open/closed state of each finger for one hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandPose {
    pub thumb_open: bool,
    /// Index, middle, ring, pinky.
    pub fingers_open: [bool; 4],
}

impl HandPose {
    /// Returns `None` when the set does not carry the full 21-point hand scheme.
    pub fn from_landmarks(landmarks: &LandmarkSet) -> Option<Self> {
        if !landmarks.is_full_hand() {
            return None;
        }
        let pts = &landmarks.points;
        let wrist = pts[hand::WRIST];

        // A finger is open when its tip is farther from the wrist than its middle knuckle.
        let mut fingers_open = [false; 4];
        for (open, &(tip, pip)) in fingers_open.iter_mut().zip(hand::FINGERS.iter()) {
            *open = pts[tip].distance(&wrist) > pts[pip].distance(&wrist);
        }

        let pinky_base = pts[hand::PINKY_MCP];
        let thumb_open =
            pts[hand::THUMB_TIP].distance(&pinky_base) > pts[hand::THUMB_IP].distance(&pinky_base);

        Some(Self {
            thumb_open,
            fingers_open,
        })
    }

    pub fn to_move(&self) -> Move {
        let [index, middle, ring, pinky] = self.fingers_open;
        if self.fingers_open.iter().all(|&open| open) && self.thumb_open {
            Move::Paper
        } else if index && middle && !ring && !pinky {
            Move::Scissors
        } else if !self.fingers_open.iter().any(|&open| open) {
            Move::Rock
        } else {
            Move::Unknown
        }
    }
}

pub fn classify_move(landmarks: &LandmarkSet) -> Move {
    HandPose::from_landmarks(landmarks)
        .map(|pose| pose.to_move())
        .unwrap_or(Move::Unknown)
}

/// Pen-down for air drawing: index finger raised (tip above its middle knuckle
/// in image space) while middle, ring and pinky are not.
pub fn is_pen_down(landmarks: &LandmarkSet) -> bool {
    if !landmarks.is_full_hand() {
        return false;
    }
    let pts = &landmarks.points;
    let raised: Vec<bool> = hand::FINGERS
        .iter()
        .map(|&(tip, pip)| pts[tip].y < pts[pip].y)
        .collect();
    raised[0] && !raised[1..].iter().any(|&r| r)
}

pub fn resolve_winner(player: Move, computer: Move) -> Winner {
    if player == computer {
        Winner::Tie
    } else if player.beats() == Some(computer) {
        Winner::Player
    } else {
        Winner::Computer
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{Landmark, LandmarkSet, hand};

    /// Synthetic upright hand. `fingers` are index..pinky; an open finger has its
    /// tip well above the knuckle, a closed one curls back toward the wrist.
    pub fn hand_with(thumb_open: bool, fingers: [bool; 4]) -> LandmarkSet {
        hand_at(0.5, 0.9, thumb_open, fingers)
    }

    pub fn hand_at(wrist_x: f32, wrist_y: f32, thumb_open: bool, fingers: [bool; 4]) -> LandmarkSet {
        let mut points = vec![Landmark::new(wrist_x, wrist_y); hand::NUM_LANDMARKS];
        let at = |dx: f32, dy: f32| Landmark::new(wrist_x + dx, wrist_y + dy);

        points[1] = at(-0.06, -0.05);
        points[2] = at(-0.09, -0.12);
        points[hand::THUMB_IP] = at(-0.10, -0.20);
        points[hand::THUMB_TIP] = if thumb_open {
            at(-0.20, -0.25)
        } else {
            at(0.05, -0.20)
        };

        let columns = [-0.05, 0.0, 0.05, 0.10];
        for (finger, (&open, &dx)) in fingers.iter().zip(columns.iter()).enumerate() {
            let mcp = 5 + finger * 4;
            points[mcp] = at(dx, -0.20);
            points[mcp + 1] = at(dx, -0.30);
            if open {
                points[mcp + 2] = at(dx, -0.40);
                points[mcp + 3] = at(dx, -0.50);
            } else {
                points[mcp + 2] = at(dx, -0.24);
                points[mcp + 3] = at(dx, -0.16);
            }
        }

        LandmarkSet::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::hand_with;
    use super::*;

    #[test]
    fn open_hand_is_paper() {
        assert_eq!(classify_move(&hand_with(true, [true; 4])), Move::Paper);
    }

    #[test]
    fn two_fingers_are_scissors_regardless_of_thumb() {
        let fingers = [true, true, false, false];
        assert_eq!(classify_move(&hand_with(false, fingers)), Move::Scissors);
        assert_eq!(classify_move(&hand_with(true, fingers)), Move::Scissors);
    }

    #[test]
    fn fist_is_rock() {
        assert_eq!(classify_move(&hand_with(false, [false; 4])), Move::Rock);
        assert_eq!(classify_move(&hand_with(true, [false; 4])), Move::Rock);
    }

    #[test]
    fn other_poses_are_unknown() {
        assert_eq!(classify_move(&hand_with(false, [true; 4])), Move::Unknown);
        assert_eq!(
            classify_move(&hand_with(false, [true, false, false, false])),
            Move::Unknown
        );
        assert_eq!(classify_move(&LandmarkSet::default()), Move::Unknown);
    }

    #[test]
    fn classification_is_deterministic() {
        let hand = hand_with(true, [true, true, false, false]);
        let first = classify_move(&hand);
        for _ in 0..10 {
            assert_eq!(classify_move(&hand.clone()), first);
        }
    }

    #[test]
    fn pen_down_needs_index_only() {
        assert!(is_pen_down(&hand_with(false, [true, false, false, false])));
        assert!(is_pen_down(&hand_with(true, [true, false, false, false])));
        assert!(!is_pen_down(&hand_with(false, [true, true, false, false])));
        assert!(!is_pen_down(&hand_with(false, [false; 4])));
        assert!(!is_pen_down(&LandmarkSet::default()));
    }

    #[test]
    fn winner_follows_precedence() {
        assert_eq!(resolve_winner(Move::Rock, Move::Scissors), Winner::Player);
        assert_eq!(resolve_winner(Move::Scissors, Move::Rock), Winner::Computer);
        assert_eq!(resolve_winner(Move::Paper, Move::Rock), Winner::Player);
        assert_eq!(resolve_winner(Move::Scissors, Move::Paper), Winner::Player);
        assert_eq!(resolve_winner(Move::Rock, Move::Paper), Winner::Computer);
        for m in Move::PLAYABLE {
            assert_eq!(resolve_winner(m, m), Winner::Tie);
        }
    }
}
