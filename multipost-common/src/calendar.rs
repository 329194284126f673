//! Month view of scheduled posts.

use crate::model::post::Post;
use std::iter;
use time::{Date, Month, error::ComponentRange};

/// Posts shown inline in a day cell; the rest are only in [`CalendarDay::posts`].
pub const DAY_PREVIEW_LEN: usize = 2;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CalendarDay {
    date: Date,
    posts: Vec<Post>,
}

impl CalendarDay {
    #[must_use]
    pub fn date(&self) -> Date {
        self.date
    }

    #[must_use]
    pub fn day(&self) -> u8 {
        self.date.day()
    }

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn preview(&self) -> &[Post] {
        &self.posts[..self.posts.len().min(DAY_PREVIEW_LEN)]
    }

    /// How many posts do not fit into the preview.
    #[must_use]
    pub fn overflow(&self) -> usize {
        self.posts.len().saturating_sub(DAY_PREVIEW_LEN)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CalendarMonth {
    year: i32,
    month: Month,
    days: Vec<CalendarDay>,
}

impl CalendarMonth {
    /// Buckets `posts` by the calendar date of their schedule time.
    ///
    /// Posts without a schedule time, or scheduled in another month, are left out.
    pub fn bucket<'a>(
        year: i32,
        month: Month,
        posts: impl IntoIterator<Item = &'a Post>,
    ) -> Result<Self, ComponentRange> {
        let first = Date::from_calendar_date(year, month, 1)?;
        let mut days: Vec<_> = iter::successors(Some(first), |date| date.next_day())
            .take_while(|date| date.month() == month)
            .map(|date| CalendarDay {
                date,
                posts: Vec::new(),
            })
            .collect();

        for post in posts {
            let Some(date) = post.scheduled_at.map(|scheduled_at| scheduled_at.date()) else {
                continue;
            };
            if date.year() == year && date.month() == month {
                days[usize::from(date.day()) - 1].posts.push(post.clone());
            }
        }

        Ok(Self { year, month, days })
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn month(&self) -> Month {
        self.month
    }

    #[must_use]
    pub fn days(&self) -> &[CalendarDay] {
        &self.days
    }

    #[must_use]
    pub fn day(&self, day: u8) -> Option<&CalendarDay> {
        self.days.get(usize::from(day).checked_sub(1)?)
    }

    /// Empty cells before the first day in a week starting on Sunday.
    #[must_use]
    pub fn leading_blanks(&self) -> u8 {
        self.days
            .first()
            .map_or(0, |day| day.date.weekday().number_days_from_sunday())
    }
}
