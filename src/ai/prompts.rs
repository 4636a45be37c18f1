use super::{AiRequest, ImageData, Stage};
use crate::processing::ProblemInfo;

const EXTRACTION_SYSTEM: &str = "You are a coding challenge interpreter. Analyze the screenshots of the coding problem \
     and extract all relevant information. Return the information in JSON format with these fields: \
     problem_statement, constraints, example_input, example_output. \
     Return only the structured JSON without any other text.";

const SOLUTION_SYSTEM: &str = "You are an expert coding interview assistant. Provide clear, optimal solutions \
     with detailed explanations.";

const DEBUG_SYSTEM: &str = "You are a coding interview assistant helping debug and improve solutions. \
     The screenshots show the candidate's code together with error messages, incorrect output or test cases.";

/// Section headers the debug stage is asked to produce, in order.
pub const DEBUG_SECTIONS: [&str; 5] = [
    "### Issues Identified",
    "### Specific Improvements and Corrections",
    "### Optimizations",
    "### Explanation of Changes Needed",
    "### Key Points",
];

pub fn extraction_request(language: &str, images: Vec<ImageData>) -> AiRequest {
    AiRequest {
        stage: Stage::Extraction,
        system_prompt: EXTRACTION_SYSTEM.to_string(),
        prompt: format!(
            "Extract the coding problem details from these screenshots. Return in JSON format. \
             The solution will be written in {}.",
            language
        ),
        images,
    }
}

fn push_problem(prompt: &mut String, problem: &ProblemInfo) {
    prompt.push_str("PROBLEM STATEMENT:\n");
    prompt.push_str(&problem.problem_statement);
    prompt.push_str("\n\n");

    if !problem.constraints.is_empty() {
        prompt.push_str("CONSTRAINTS:\n");
        prompt.push_str(&problem.constraints);
        prompt.push_str("\n\n");
    }

    if !problem.example_input.is_empty() {
        prompt.push_str("EXAMPLE INPUT:\n");
        prompt.push_str(&problem.example_input);
        prompt.push_str("\n\n");
    }

    if !problem.example_output.is_empty() {
        prompt.push_str("EXAMPLE OUTPUT:\n");
        prompt.push_str(&problem.example_output);
        prompt.push_str("\n\n");
    }
}

pub fn solution_request(problem: &ProblemInfo, language: &str) -> AiRequest {
    let mut prompt = String::from("Write a solution for the following coding problem.\n\n");
    push_problem(&mut prompt, problem);
    prompt.push_str(&format!("LANGUAGE: {}\n\n", language));
    prompt.push_str(&format!(
        "Answer with exactly these four labeled sections:\n\
         1. Code: a clean, optimized implementation in {} inside a fenced code block\n\
         2. Thoughts: a bulleted list of the key insights behind the approach\n\
         3. Time complexity: O(X) followed by at least two sentences explaining why\n\
         4. Space complexity: O(X) followed by at least two sentences explaining why\n\n",
        language
    ));
    prompt.push_str(
        "Write complexity explanations like \"Time complexity: O(n) because we visit each element once. \
         Every element must be examined at least once, so this is optimal.\" \
         The code should be efficient, commented, and handle edge cases.",
    );

    AiRequest {
        stage: Stage::Solution,
        system_prompt: SOLUTION_SYSTEM.to_string(),
        prompt,
        images: Vec::new(),
    }
}

pub fn debug_request(problem: &ProblemInfo, language: &str, images: Vec<ImageData>) -> AiRequest {
    let mut system_prompt = String::from(DEBUG_SYSTEM);
    system_prompt.push_str("\n\nYour response MUST use these section headers, in this order:\n");
    for header in DEBUG_SECTIONS {
        system_prompt.push_str(header);
        system_prompt.push('\n');
    }
    system_prompt.push_str(
        "\nUse bullet points inside each section. Put any code in fenced blocks with a language tag.",
    );

    let mut prompt = format!(
        "I'm solving this coding problem in {}. Help me debug or improve my solution.\n\n",
        language
    );
    push_problem(&mut prompt, problem);
    prompt.push_str(
        "The screenshots show my code and the errors or test cases. List the issues, the corrections \
         needed, any optimizations, and explain why each change matters.",
    );

    AiRequest {
        stage: Stage::Debugging,
        system_prompt,
        prompt,
        images,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sum() -> ProblemInfo {
        ProblemInfo {
            problem_statement: "Two Sum".to_string(),
            constraints: "n<=1e5".to_string(),
            example_input: "[2,7]".to_string(),
            example_output: "[0,1]".to_string(),
        }
    }

    #[test]
    fn test_extraction_mentions_language_and_fields() {
        let request = extraction_request("rust", vec![ImageData::png("x")]);
        assert_eq!(request.stage, Stage::Extraction);
        assert!(request.prompt.contains("rust"));
        assert!(request.system_prompt.contains("example_output"));
        assert_eq!(request.images.len(), 1);
    }

    #[test]
    fn test_solution_embeds_problem_and_sections() {
        let request = solution_request(&two_sum(), "go");
        assert!(request.prompt.contains("Two Sum"));
        assert!(request.prompt.contains("n<=1e5"));
        assert!(request.prompt.contains("LANGUAGE: go"));
        assert!(request.prompt.contains("Time complexity:"));
        assert!(request.prompt.contains("Space complexity:"));
        assert!(request.images.is_empty());
    }

    #[test]
    fn test_solution_skips_empty_fields() {
        let problem = ProblemInfo {
            problem_statement: "Reverse".to_string(),
            constraints: String::new(),
            example_input: String::new(),
            example_output: String::new(),
        };
        let request = solution_request(&problem, "python");
        assert!(!request.prompt.contains("CONSTRAINTS"));
    }

    #[test]
    fn test_debug_template() {
        let request = debug_request(&two_sum(), "java", vec![]);
        assert_eq!(request.stage, Stage::Debugging);
        for header in DEBUG_SECTIONS {
            assert!(request.system_prompt.contains(header));
        }
        assert!(request.prompt.contains("java"));
        assert!(request.prompt.contains("Two Sum"));
    }
}
