use super::error::SegmenterError;
use super::model::{DialogueSegment, SpeakerRole};
use regex::Regex;

/// Reading speed used for the duration estimate
const CHARS_PER_SECOND: u32 = 3;
const MIN_DURATION_SECS: u32 = 5;
const MAX_DURATION_SECS: u32 = 90;

/// Segments shorter than this are discarded as noise
const MIN_SEGMENT_CHARS: usize = 2;

/// Speaker label families recognized at line start. The first group maps to
/// the host voice, the second to the curator voice.
const LABEL_PATTERN: &str =
    r"(?i)^(진행자|사회자|호스트|host|mc|큐레이터|도슨트|해설자|curator|guide|docent)\s*[:：]\s*(.*)$";

fn role_for_label(label: &str) -> SpeakerRole {
    match label.to_lowercase().as_str() {
        "진행자" | "사회자" | "호스트" | "host" | "mc" => SpeakerRole::Host,
        _ => SpeakerRole::Curator,
    }
}

/// Strip light formatting markup (bold/italic/code markers) from a line
fn strip_markup(line: &str) -> String {
    let markup = Regex::new(r"[*_`~]+").unwrap();
    markup.replace_all(line, "").trim().to_string()
}

struct SpeakerTurn {
    speaker: SpeakerRole,
    lines: Vec<String>,
    chapter_index: u32,
}

/// Split a raw two-speaker transcript into ordered dialogue segments.
///
/// Lines starting with a recognized speaker label open a new turn; unlabeled
/// lines continue the current turn; lines before the first label and other
/// malformed content are skipped. Markdown-style heading lines advance the
/// chapter index instead of producing a segment. Adjacent segments never
/// share a speaker: same-speaker turns are merged after noise filtering.
pub fn segment_transcript(raw: &str) -> Result<Vec<DialogueSegment>, SegmenterError> {
    let label_pattern = Regex::new(LABEL_PATTERN).unwrap();

    let mut turns: Vec<SpeakerTurn> = Vec::new();
    let mut current: Option<SpeakerTurn> = None;
    let mut chapter = 1u32;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Chapter heading: flush the open turn and advance the chapter,
        // unless nothing has been emitted yet (a leading title stays chapter 1)
        if line.starts_with('#') {
            if let Some(turn) = current.take() {
                turns.push(turn);
            }
            if !turns.is_empty() {
                chapter += 1;
            }
            continue;
        }

        let line = strip_markup(line);
        if line.is_empty() {
            continue;
        }

        if let Some(captures) = label_pattern.captures(&line) {
            let speaker = role_for_label(&captures[1]);
            let text = captures[2].trim().to_string();

            match current.as_mut() {
                Some(turn) if turn.speaker == speaker => {
                    // Repeated label for the same speaker: continue the turn
                    if !text.is_empty() {
                        turn.lines.push(text);
                    }
                }
                _ => {
                    if let Some(turn) = current.take() {
                        turns.push(turn);
                    }
                    let lines = if text.is_empty() { Vec::new() } else { vec![text] };
                    current = Some(SpeakerTurn {
                        speaker,
                        lines,
                        chapter_index: chapter,
                    });
                }
            }
        } else if let Some(turn) = current.as_mut() {
            // Unlabeled continuation of the current speaker
            turn.lines.push(line);
        }
        // Unlabeled text before the first speaker label is skipped
    }
    if let Some(turn) = current.take() {
        turns.push(turn);
    }

    // Noise filter, then merge adjacent same-speaker turns so the
    // no-adjacent-same-speaker invariant holds even after discards
    let mut merged: Vec<SpeakerTurn> = Vec::new();
    for turn in turns {
        let text = turn.lines.join(" ");
        if text.chars().count() < MIN_SEGMENT_CHARS {
            continue;
        }
        match merged.last_mut() {
            Some(previous) if previous.speaker == turn.speaker => {
                previous.lines.extend(turn.lines);
            }
            _ => merged.push(turn),
        }
    }

    let segments: Vec<DialogueSegment> = merged
        .into_iter()
        .enumerate()
        .map(|(index, turn)| {
            let text = turn.lines.join(" ");
            let estimated_duration_secs = estimate_duration_secs(&text);
            DialogueSegment {
                sequence_number: index as u32 + 1,
                speaker: turn.speaker,
                text,
                estimated_duration_secs,
                chapter_index: turn.chapter_index,
            }
        })
        .collect();

    if segments.is_empty() {
        return Err(SegmenterError::EmptyTranscript);
    }

    tracing::debug!(
        segment_count = segments.len(),
        chapters = segments.last().map(|s| s.chapter_index).unwrap_or(1),
        "Transcript segmented"
    );

    Ok(segments)
}

/// `max(5, min(90, ceil(chars / CHARS_PER_SECOND)))`
fn estimate_duration_secs(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    chars
        .div_ceil(CHARS_PER_SECOND)
        .clamp(MIN_DURATION_SECS, MAX_DURATION_SECS)
}
