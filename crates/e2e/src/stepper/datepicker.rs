//! MUI calendar picker driver

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::page::{Locator, Page};

const HEADER: &str = ".MuiPickersCalendarHeader-label";

/// Month clicks allowed after jumping to the right year
const MAX_MONTH_STEPS: usize = 24;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month0: u32) -> &'static str {
    MONTHS[(month0 % 12) as usize]
}

/// Zero-based month of a header label such as "October 2026"
pub fn month_index(label: &str) -> Option<u32> {
    let word = label.split_whitespace().next()?;
    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(word))
        .map(|i| i as u32)
}

fn header() -> Locator {
    Locator::css(HEADER).first()
}

/// Open the picker behind `trigger` and select `date`
///
/// Jumps to the year through the header's year view, then walks month by
/// month and clicks the day inside the grid for that month.
pub async fn pick_date(page: &mut dyn Page, trigger: &Locator, date: NaiveDate) -> E2eResult<()> {
    page.click(trigger).await?;

    let shown = page.inner_text(&header()).await?;
    page.click(&Locator::text(shown.trim()).first()).await?;
    page.click(&Locator::role("radio", date.year().to_string()))
        .await?;

    let target = date.month0();
    let mut steps = 0;
    loop {
        let label = page.inner_text(&header()).await?;
        let visible = month_index(&label).ok_or_else(|| E2eError::StepFailed {
            step: "date picker".to_string(),
            reason: format!("unrecognised calendar header '{}'", label),
        })?;
        if visible == target {
            break;
        }
        if steps == MAX_MONTH_STEPS {
            return Err(E2eError::StepFailed {
                step: "date picker".to_string(),
                reason: format!("{} not reached, calendar shows '{}'", date, label),
            });
        }
        let direction = if visible > target {
            "Previous month"
        } else {
            "Next month"
        };
        debug!("Calendar shows {}, clicking {}", label, direction);
        page.click(&Locator::button(direction)).await?;
        steps += 1;
    }

    let grid = format!("{} {}", month_name(target), date.year());
    page.click(
        &Locator::role("grid", grid)
            .locate(Locator::role("gridcell", date.day().to_string()).exact())
            .first(),
    )
    .await
}
