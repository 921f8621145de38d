use serde::{Deserialize, Serialize};

/// State of a (user, image) like pair after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeStatus {
    Liked,
    Unliked,
}

impl LikeStatus {
    pub fn from_liked(liked: bool) -> Self {
        if liked { Self::Liked } else { Self::Unliked }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Liked => "Liked",
            Self::Unliked => "Unliked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LikeStatus::Liked).unwrap(), "\"liked\"");
        assert_eq!(serde_json::to_string(&LikeStatus::Unliked).unwrap(), "\"unliked\"");
    }

    #[test]
    fn from_liked_maps_both_states() {
        assert_eq!(LikeStatus::from_liked(true), LikeStatus::Liked);
        assert_eq!(LikeStatus::from_liked(false).message(), "Unliked");
    }
}
