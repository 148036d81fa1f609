// Band-scoring LLM prompt templates.
// All prompts for the scoring module are defined here.

pub const WRITING_SYSTEM: &str = "\
You are a certified IELTS Writing examiner. \
Score strictly against the public IELTS Writing band descriptors. \
Do not reward length for its own sake, and penalise answers under the minimum word count.";

pub const SPEAKING_SYSTEM: &str = "\
You are a certified IELTS Speaking examiner. \
You are given a transcript of a spoken answer, not audio. \
Judge pronunciation only from evidence visible in the transcript (self-corrections, \
fillers, transcription artefacts) and say so in the feedback.";

pub const WRITING_PROMPT_TEMPLATE: &str = r#"Score the following IELTS Writing response.

TASK TYPE: {task_type}
MINIMUM WORDS: {min_words}
CANDIDATE WORD COUNT: {word_count}

TASK PROMPT:
{prompt_text}

CANDIDATE RESPONSE:
{candidate_text}

OUTPUT SCHEMA (return exactly one JSON object with this structure):
{
  "task_response": number,
  "coherence_cohesion": number,
  "lexical_resource": number,
  "grammatical_range_accuracy": number,
  "overall": number,
  "feedback": {
    "task_response": "string",
    "coherence_cohesion": "string",
    "lexical_resource": "string",
    "grammatical_range_accuracy": "string",
    "strengths": "string",
    "improvements": "string"
  },
  "weaknesses": ["short label, e.g. 'article use'"]
}

RULES:
1. "task_response" means Task Achievement for Task 1 and Task Response for Task 2.
2. "overall" is the mean of the four criteria rounded to the nearest 0.5.
3. {half_band}
4. "weaknesses" lists at most 5 short, reusable labels, not sentences.
5. Return ONLY the JSON object, nothing else."#;

pub const SPEAKING_PROMPT_TEMPLATE: &str = r#"Score the following IELTS Speaking answer from its transcript.

PART: {task_type}
TRANSCRIPT WORD COUNT: {word_count}

QUESTION:
{prompt_text}

TRANSCRIPT:
{candidate_text}

OUTPUT SCHEMA (return exactly one JSON object with this structure):
{
  "fluency_coherence": number,
  "lexical_resource": number,
  "grammatical_range_accuracy": number,
  "pronunciation": number,
  "overall": number,
  "feedback": {
    "fluency_coherence": "string",
    "lexical_resource": "string",
    "grammatical_range_accuracy": "string",
    "pronunciation": "string",
    "strengths": "string",
    "improvements": "string"
  },
  "weaknesses": ["short label, e.g. 'limited linking words'"]
}

RULES:
1. "overall" is the mean of the four criteria rounded to the nearest 0.5.
2. {half_band}
3. "weaknesses" lists at most 5 short, reusable labels, not sentences.
4. Return ONLY the JSON object, nothing else."#;
