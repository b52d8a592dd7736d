//! Lead quality score in `0..=100`, derived from which contact fields are filled in and
//! where the lead came from.

pub const MAX_SCORE: i32 = 100;

/// The inputs that influence a lead's score.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScoreInput<'a> {
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub company: Option<&'a str>,
    pub job_title: Option<&'a str>,
    pub website: Option<&'a str>,
    pub source: Option<&'a str>,
}

fn present(v: Option<&str>) -> bool {
    v.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Bonus for the acquisition channel. Unknown or missing sources count as `other`.
pub fn source_bonus(source: Option<&str>) -> i32 {
    let normalized = source
        .map(|s| s.trim().to_ascii_lowercase().replace(['-', ' '], "_"))
        .unwrap_or_default();
    match normalized.as_str() {
        "referral" => 30,
        "website" => 25,
        "social_media" => 15,
        "email_campaign" => 10,
        "cold_call" => 5,
        _ => 5,
    }
}

pub fn calculate_score(input: &ScoreInput<'_>) -> i32 {
    let mut score = 0;
    if present(input.email) { score += 20; }
    if present(input.phone) { score += 15; }
    if present(input.company) { score += 10; }
    if present(input.job_title) { score += 10; }
    if present(input.website) { score += 5; }
    score += source_bonus(input.source);
    score.min(MAX_SCORE)
}
