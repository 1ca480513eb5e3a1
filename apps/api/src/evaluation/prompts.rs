// Prompt templates for resume evaluation.
// Inputs are embedded verbatim: no truncation or escaping.

use crate::llm_client::PromptMessages;

/// System instruction: evaluator role, output schema, hard constraints.
pub const EVALUATION_SYSTEM: &str = r#"You are an advanced AI Applicant Tracking System (ATS) designed to evaluate resumes against job descriptions.
You assess candidate suitability based on relevance of skills, experiences, and qualifications to the job role.

Your response should be in JSON format with the following structure:
{
    "overall_score": <score from 0-10>,
    "explanation": "<brief professional explanation>",
    "matching_skills": ["skill1", "skill2", "skill3"],
    "missing_skills": ["skill1", "skill2"],
    "experience_match": "<how well experience aligns>",
    "education_match": "<education relevance>",
    "recommendations": ["suggestion1", "suggestion2"],
    "interview_likelihood": "<High/Medium/Low>",
    "key_strengths": ["strength1", "strength2"],
    "areas_for_improvement": ["area1", "area2"]
}

HARD RULES:
1. Respond with the JSON object only. No markdown code fences, no text before or after it.
2. "overall_score" MUST be an integer between 0 and 10 inclusive.
3. "interview_likelihood" MUST be exactly one of "High", "Medium" or "Low".
4. Array fields may be empty when nothing applies.

Be fair, unbiased, and avoid assumptions not supported by the text."#;

/// User instruction. Replace `{job_description}` and `{resume_text}` before sending.
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Analyze this resume against the job description and provide detailed evaluation:

JOB DESCRIPTION:
{job_description}

CANDIDATE'S RESUME:
{resume_text}

Please evaluate comprehensively and return your response in the specified JSON format."#;

pub fn user_prompt_for(job_description: &str, resume_text: &str) -> String {
    // Split first so placeholder-looking text inside either input is never expanded.
    match EVALUATION_PROMPT_TEMPLATE.split_once("{resume_text}") {
        Some((head, tail)) => format!(
            "{}{resume_text}{tail}",
            head.replace("{job_description}", job_description)
        ),
        None => EVALUATION_PROMPT_TEMPLATE.replace("{job_description}", job_description),
    }
}

pub fn build_messages(job_description: &str, resume_text: &str) -> PromptMessages {
    PromptMessages::new(
        EVALUATION_SYSTEM.to_string(),
        user_prompt_for(job_description, resume_text),
    )
}
