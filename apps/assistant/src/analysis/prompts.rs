// All LLM prompt text for the job/CV analysis.

/// System prompt describing the six-step job application task.
pub const ANALYSIS_SYSTEM: &str = "You are a helpful assistant who is especially tailored to assist \
    with job applications. In particular, when given details about a job post and provided an \
    accompanying CV, your role is to: \
    1) Analyse all the description, requirements, and details of the job post \
    2) Analyse all the details of the accompanying CV against the details and requirements of the job post \
    3) Generate tailored CV bullet points, emphasising the relevant experience in the CV that matches \
    the details of the job post \
    4) Identify any skill gaps, whereby the job post has required or relevant skills beyond those which \
    are in the CV, and provide learning recommendations/advice on how to bridge this gap to better meet \
    the requirements of the job post \
    5) Suggest cover letter talking points which are relevant to the details in the CV in relation to \
    the job post \
    6) Estimate a salary range based on the location, requirements and position of the given job, to \
    highlight prospects of career progression if successfully hired in the given role.";

/// Closing instructions of the user prompt: the five markdown subsections requested.
const ANALYSIS_SECTIONS: &str = "Please write a detailed analysis in markdown, including:
- A comparison of my CV against the job post, highlighting the details/experience in my CV that are relevant to the job post.
- Identification of any existing skill gaps where the job post requires skills beyond those detailed in my CV.
- Learning advice and recommendations on how to bridge any identified skill gaps.
- Suggested relevant talking points for a cover letter, taking into account the details in my CV and the job post.
- A salary range estimation for if I were hired in the given job role and progressed in my career.";

/// System and user messages for one analysis request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Builds the prompt pair. Both inputs are embedded verbatim, untruncated.
pub fn build_prompt(job_text: &str, cv_text: &str) -> PromptPair {
    PromptPair {
        system: ANALYSIS_SYSTEM.to_string(),
        user: format!(
            "Here is an extract of a job post: {job_text}. And here is my CV: {cv_text}.\n\
             {ANALYSIS_SECTIONS}"
        ),
    }
}
