use super::model::SynthesisJob;
use crate::domain::dialogue::DialogueSegment;

/// Order segments into jobs that minimize total batch completion time.
///
/// `priority = text_chars/100 + sequence_index/10`: shorter jobs and
/// earlier-sequence jobs sort first, so a few very long utterances do not
/// hold back the completion of the whole run, while near-ties resolve in
/// original dialogue order. Pure sort, no I/O, cannot fail.
pub fn schedule(segments: Vec<DialogueSegment>) -> Vec<SynthesisJob> {
    let mut current_chapter = 0u32;
    let mut chapter_counter = 0u32;

    let mut jobs: Vec<SynthesisJob> = segments
        .into_iter()
        .enumerate()
        .map(|(index, segment)| {
            if segment.chapter_index != current_chapter {
                current_chapter = segment.chapter_index;
                chapter_counter = 0;
            }
            chapter_counter += 1;

            let priority =
                segment.text.chars().count() as f32 / 100.0 + index as f32 / 10.0;
            SynthesisJob {
                segment,
                priority,
                chapter_segment_number: chapter_counter,
            }
        })
        .collect();

    jobs.sort_by(|a, b| a.priority.total_cmp(&b.priority));
    jobs
}
