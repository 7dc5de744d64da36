use serde::{Deserialize, Serialize};

/// Activity categories that contribute to the engagement score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Quiz,
    Forum,
    Lesson,
    Video,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Quiz,
        Category::Forum,
        Category::Lesson,
        Category::Video,
    ];

    /// `(component, action)` pair an event must carry to count toward the category.
    pub const fn signature(self) -> (&'static str, &'static str) {
        match self {
            Category::Quiz => ("mod_quiz", "attempted"),
            Category::Forum => ("mod_forum", "posted"),
            Category::Lesson => ("mod_lesson", "viewed"),
            Category::Video => ("mod_resource", "video_watched"),
        }
    }

    /// Sub-score points earned per matching event.
    pub const fn points_per_event(self) -> u64 {
        match self {
            Category::Quiz => 10,
            Category::Forum => 5,
            Category::Lesson => 2,
            Category::Video => 8,
        }
    }
}

/// Relative importance of each category in the weighted average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub quiz: u32,
    pub forum: u32,
    pub lesson: u32,
    pub video: u32,
}

impl ScoringWeights {
    pub const fn weight(&self, category: Category) -> u32 {
        match category {
            Category::Quiz => self.quiz,
            Category::Forum => self.forum,
            Category::Lesson => self.lesson,
            Category::Video => self.video,
        }
    }

    /// Sum of the weights, never below 1 so it can divide.
    pub fn total(&self) -> u64 {
        let sum: u64 = Category::ALL
            .iter()
            .map(|category| u64::from(self.weight(*category)))
            .sum();
        sum.max(1)
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            quiz: 20,
            forum: 25,
            lesson: 15,
            video: 40,
        }
    }
}
