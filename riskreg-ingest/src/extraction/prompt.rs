//! Extraction prompt

/// Build the instruction prompt for one piece of content
///
/// Output depends only on the three inputs.
pub fn build_extraction_prompt(content: &str, project_code: &str, source_type: &str) -> String {
    format!(
        r#"Analyze this {source_type} content for project {project_code} and extract the following information in JSON format:

1. Risks: any mentioned risks, concerns, potential issues, or problems that could affect the project.
2. Tasks: action items, assignments, or work that needs to be done.
3. Decisions: any decisions made or conclusions reached.

For each RISK, provide:
- title: Brief title (max 100 chars)
- description: Detailed description
- category: One of [Technical, Schedule, Budget, Resource, External, Safety, Quality]
- probability: One of [Low, Medium, High]
- impact: One of [Low, Medium, High]
- owner: Person responsible (if mentioned, otherwise "TBD")
- mitigation_plan: Any mentioned mitigation strategies (otherwise empty string)

For each TASK, provide:
- task: Description of the task
- owner: Person assigned (if mentioned, otherwise "TBD")
- due_date: Due date if mentioned (format: YYYY-MM-DD), otherwise null
- linked_risk: Existing risk ID the task addresses if the content names one (for example R-2025-004), otherwise null

For each DECISION, provide:
- decision: What was decided
- context: Why it was decided (if mentioned)

Return ONLY valid JSON with exactly these three keys:
{{
    "risks": [
        {{
            "title": "...",
            "description": "...",
            "category": "...",
            "probability": "...",
            "impact": "...",
            "owner": "...",
            "mitigation_plan": "..."
        }}
    ],
    "tasks": [
        {{
            "task": "...",
            "owner": "...",
            "due_date": null,
            "linked_risk": null
        }}
    ],
    "decisions": [
        {{
            "decision": "...",
            "context": "..."
        }}
    ]
}}

If no items are found for a category, return an empty array.

CONTENT:
{content}
"#,
        source_type = source_type,
        project_code = project_code,
        content = content,
    )
}
