//! Template bodies
//!
//! Wording here is a default, not a contract. What matters to callers is
//! which fields are required and that every subject value lands in the
//! prompt unmodified.

use super::{excerpt, render, Fields, PromptError};
use crate::llm::Prompt;
use crate::team::roster::{RoleProfile, Roster};

const JOURNAL_SYSTEM_PROMPT: &str = "You are an expert therapeutic assistant specializing in:
- Identifying and analyzing cognitive distortions, especially in family dynamics
- Multiple therapeutic modalities: CBT, DBT, Psychodynamic, Family Systems, Somatic therapy
- DSM-5-TR diagnostic criteria and assessment
- Trauma-informed care and attachment theory

Your role is to analyze journal entries for patterns and cognitive distortions, offer insights \
from several therapeutic perspectives, and track progress across entries.

Always quote directly from entries as evidence, give specific and actionable insights, include \
disclaimers for any diagnostic content, and stay warm and professional.";

const TEAM_SYSTEM_PROMPT: &str = "You are a professional on a research team analyzing family \
dynamics for a book. Provide deep, nuanced, theoretical analysis while respecting boundaries \
about not inventing content.";

const ANALYSIS_BOUNDARIES: &str = "CRITICAL: You are analyzing ONLY what is explicitly provided.

NEVER:
- Invent family members not mentioned
- Create childhood scenarios not described
- Add events that didn't happen
- Assume relationships not stated
- Speculate about the past unless specifically shared

ALWAYS:
- Quote directly from the provided content
- Say \"Based on what you've shared...\" when analyzing
- Mark any general examples as \"In situations like these (not necessarily yours)...\"
- Acknowledge when information is limited";

/// The subject entry block shared by the single-entry templates
fn subject_block(fields: &Fields) -> Result<String, PromptError> {
    Ok(format!(
        "Date: {}\nTitle: {}\nContent: {}\nEmotions: {}\nBody Sensations: {}\nResponse: {}",
        fields.text("/entry/createdAt")?,
        fields.text("/entry/title")?,
        fields.text("/entry/moment/raw_text")?,
        fields.text("/entry/initial_thoughts/emotions_felt")?,
        fields.text("/entry/initial_thoughts/body_sensations")?,
        fields.text("/entry/initial_thoughts/actual_response")?,
    ))
}

pub(super) fn entry_analysis(fields: &Fields) -> Result<Prompt, PromptError> {
    let subject = subject_block(fields)?;

    let previous = fields.optional_array("/previousEntries");
    let previous_lines: Vec<String> = previous
        .iter()
        .map(|e| {
            let entry = fields.nested(e, "previousEntries".to_string());
            format!(
                "- {}: \"{}\" - Themes: {}",
                entry.text_or("/createdAt", "unknown date"),
                entry.text_or("/title", "Untitled"),
                entry.text_or("/tags", "None"),
            )
        })
        .collect();

    let diagnostic_block = if fields.flag("/options/enableExtendedAssessment") {
        r#"
  "diagnostic_indicators": {
    "disclaimer": "Educational only - not a diagnosis",
    "patterns_noted": ["DSM-relevant patterns"],
    "probability_assessment": {
      "condition": "Most likely condition if any",
      "probability": "0-100",
      "evidence": ["Supporting observations"]
    }
  },"#
    } else {
        ""
    };

    let user = format!(
        r#"Analyze this journal entry for cognitive distortions, particularly those related to family dynamics.

CURRENT ENTRY:
{subject}

CONTEXT - Previous {count} entries for pattern recognition:
{previous}

Provide a comprehensive analysis in JSON format with this structure:
{{
  "cognitive_distortions": [
    {{
      "type": "Name of distortion",
      "quote": "Exact quote from entry",
      "context": "Family member or situation involved",
      "impact": "Emotional and behavioral impact",
      "pattern_frequency": "How often this appears across entries",
      "reframe": "Healthier perspective"
    }}
  ],
  "family_dynamics": {{
    "patterns_identified": ["List of family patterns"],
    "role_in_family": "User's role in family system",
    "boundaries": "Boundary issues observed",
    "communication_style": "How family communicates"
  }},
  "therapeutic_perspectives": {{
    "cbt": "Cognitive-behavioral analysis",
    "psychodynamic": "Unconscious patterns and defenses",
    "family_systems": "Systems perspective",
    "somatic": "Body-based observations"
  }},
  "growth_opportunities": ["Specific areas for growth"],
  "coping_strategies": ["Recommended tools and techniques"],{diagnostic_block}
  "conversation_starters": ["Questions to explore in therapy"]
}}"#,
        count = previous.len(),
        previous = previous_lines.join("\n"),
    );

    Ok(Prompt::new(JOURNAL_SYSTEM_PROMPT, user))
}

pub(super) fn autonomous_dialogue(fields: &Fields) -> Result<Prompt, PromptError> {
    let entries = fields.non_empty_array("/entries")?;

    let themes: Vec<String> = entries
        .iter()
        .take(5)
        .filter_map(|e| e.get("tags").and_then(|t| t.as_array()))
        .flatten()
        .map(render)
        .collect();

    let latest = fields.nested(&entries[0], "entries[0]".to_string());

    let checkpoint = fields
        .optional("/lastCheckpoint")
        .map(|cp| {
            let summary = cp
                .get("summary")
                .or_else(|| cp.get("narrative_summary"))
                .map(render)
                .unwrap_or_else(|| cp.to_string());
            format!("\nLAST CHECKPOINT:\n{}\n", summary)
        })
        .unwrap_or_default();

    let user = format!(
        r#"The user hasn't made a journal entry in several days. Generate a therapeutic conversation between two different therapeutic perspectives, discussing patterns from their existing entries to maintain therapeutic momentum.

AVAILABLE DATA:
- {count} total journal entries
- Most recent themes: {themes}
- Last entry: {last_date} - "{last_title}"
{checkpoint}
Create a dialogue between two therapeutic perspectives (choose from CBT, Psychodynamic, Family Systems, Somatic, or DBT) discussing the user's patterns.

Format as JSON:
{{
  "dialogue_type": "autonomous_therapeutic_conversation",
  "participants": ["Perspective 1 Name", "Perspective 2 Name"],
  "topic": "Main pattern being discussed",
  "conversation": [
    {{ "speaker": "Perspective 1", "statement": "Opening observation about a pattern", "reference": "Which entry or pattern this refers to" }},
    {{ "speaker": "Perspective 2", "response": "Different angle on the same pattern", "insight": "What this perspective adds" }}
  ],
  "synthesis": "Combined insight from both perspectives",
  "user_prompts": ["Questions for user to consider", "Experiments to try"],
  "relevance": "Why this dialogue is timely"
}}

Continue the conversation for 6-8 exchanges."#,
        count = entries.len(),
        themes = themes.join(", "),
        last_date = latest.text_or("/createdAt", "unknown date"),
        last_title = latest.text_or("/title", "Untitled"),
    );

    Ok(Prompt::new(JOURNAL_SYSTEM_PROMPT, user))
}

pub(super) fn checkpoint_report(fields: &Fields) -> Result<Prompt, PromptError> {
    let entries = fields.non_empty_array("/entries")?;

    let mut blocks = Vec::with_capacity(entries.len());
    for (i, e) in entries.iter().enumerate() {
        let entry = fields.nested(e, format!("entries[{}]", i));
        blocks.push(format!(
            "Date: {}\nTitle: {}\nContent: {}\nEmotions: {}",
            entry.text_or("/createdAt", "unknown date"),
            entry.text_or("/title", "Untitled"),
            entry.text("/moment/raw_text")?,
            entry.text_or("/initial_thoughts/emotions_felt", "not recorded"),
        ));
    }

    let previous = fields
        .optional_array("/previousCheckpoints")
        .first()
        .and_then(|cp| cp.get("summary"))
        .map(|summary| format!("PREVIOUS CHECKPOINT SUMMARY:\n{}\n", render(summary)))
        .unwrap_or_default();

    let user = format!(
        r#"Generate a comprehensive checkpoint report analyzing patterns across these journal entries.

ENTRIES TO ANALYZE ({count} entries):
{entries}

{previous}
Create a checkpoint report in JSON format:
{{
  "period_analyzed": {{ "start": "First entry date", "end": "Last entry date", "total_entries": {count} }},
  "primary_patterns": [
    {{ "pattern": "Pattern name", "frequency": "How often it appears", "evolution": "How it's changing", "evidence": ["Quotes from entries"] }}
  ],
  "cognitive_distortions_summary": {{
    "most_common": ["Top 3 distortions"],
    "improving": ["Distortions decreasing"],
    "persistent": ["Distortions unchanging"]
  }},
  "family_dynamics_evolution": {{
    "role_changes": "Any shifts in family role",
    "boundary_progress": "Boundary improvements",
    "communication_shifts": "Changes in communication"
  }},
  "therapeutic_progress": {{
    "insights_gained": ["Key realizations"],
    "skills_practiced": ["Techniques tried"],
    "challenges": ["Ongoing difficulties"]
  }},
  "recommendations": {{
    "focus_areas": ["Priority areas for next period"],
    "specific_practices": ["Concrete exercises"],
    "professional_support": "Whether to seek therapy"
  }},
  "narrative_summary": "2-3 paragraph narrative of the period"
}}"#,
        count = entries.len(),
        entries = blocks.join("\n---\n"),
    );

    Ok(Prompt::new(JOURNAL_SYSTEM_PROMPT, user))
}

pub(super) fn diagnostic_assessment(fields: &Fields) -> Result<Prompt, PromptError> {
    let entries = fields.non_empty_array("/entries")?;

    let mut lines = Vec::with_capacity(entries.len());
    for (i, e) in entries.iter().enumerate() {
        let entry = fields.nested(e, format!("entries[{}]", i));
        lines.push(format!(
            "{}: {} - {}",
            entry.text_or("/createdAt", "unknown date"),
            entry.text_or("/title", "Untitled"),
            excerpt(&entry.text("/moment/raw_text")?, 200),
        ));
    }

    let user = format!(
        r#"Provide a probabilistic diagnostic assessment based on patterns observed across all journal entries. Use DSM-5-TR criteria.

COMPLETE ENTRY HISTORY ({count} entries):
{history}

Provide assessment in JSON format:
{{
  "disclaimer": "This is an educational assessment based on journal patterns, not a medical diagnosis. Professional evaluation is recommended.",
  "entries_analyzed": {count},
  "time_span": "Duration of entries",
  "primary_considerations": [
    {{
      "condition": "DSM-5 condition name",
      "icd_10": "ICD-10 code",
      "probability": "0-100",
      "confidence": "low/moderate/high",
      "criteria_evidence": {{
        "met": ["Criteria with supporting quotes"],
        "partial": ["Partially met criteria"],
        "insufficient_data": ["Cannot assess"]
      }},
      "duration": "How long symptoms present",
      "severity": "mild/moderate/severe",
      "functional_impact": "Impact on daily life"
    }}
  ],
  "differential_diagnosis": [
    {{ "condition": "Alternative condition", "probability": "0-100", "distinguishing_factors": "What differentiates" }}
  ],
  "family_factors": {{
    "contribution": "How family dynamics affect symptoms",
    "systemic_patterns": "Family patterns influencing condition"
  }},
  "recommendations": {{
    "immediate": ["Any urgent recommendations"],
    "assessment_tools": ["Screening tools to consider"],
    "therapeutic_approaches": ["Recommended therapy types"],
    "medical_consultation": "Whether to see psychiatrist"
  }},
  "prognosis": "Expected course with/without treatment"
}}"#,
        count = entries.len(),
        history = lines.join("\n\n"),
    );

    Ok(Prompt::new(JOURNAL_SYSTEM_PROMPT, user))
}

fn peer_names(profile: &RoleProfile, roster: &Roster) -> Result<Vec<String>, PromptError> {
    profile
        .responds_to
        .iter()
        .map(|peer| {
            roster
                .profile(*peer)
                .map(|p| format!("{} ({})", p.display_name, p.id))
        })
        .collect()
}

pub(super) fn initial_analysis(
    fields: &Fields,
    profile: &RoleProfile,
    roster: &Roster,
) -> Result<Prompt, PromptError> {
    let subject = subject_block(fields)?;
    let peers = peer_names(profile, roster)?;

    let word_target = if fields.flag("/options/quickMode") {
        profile.min_word_target / 2
    } else {
        profile.min_word_target
    };

    let history = fields
        .optional_text("/historicalContext")
        .map(|ctx| format!("RELEVANT PATTERNS FROM PREVIOUS ENTRIES:\n{}\n", ctx))
        .unwrap_or_default();

    let questions: Vec<String> = profile
        .questions
        .iter()
        .map(|q| format!("\"{}\"", q))
        .collect();

    let user = format!(
        r#"You are {name}, {credentials}.

{boundaries}

Your expertise: {expertise}
Your focus areas: {focus}
Your style: {style}

ANALYZE THIS FAMILY DYNAMIC:
{subject}

{history}
Provide your analysis in EXACTLY this JSON structure:
{{
  "professional": "{role}",
  "speaker_name": "{name}",
  "analysis": {{
    "opening_observation": "Your initial reaction to this family dynamic",
    "pattern_identification": {{
      "primary_pattern": "The main pattern you see",
      "evidence": ["Direct quote 1", "Direct quote 2", "Direct quote 3"],
      "pattern_function": "What this pattern accomplishes in the family system",
      "pattern_cost": "What this pattern costs the person"
    }},
    "theoretical_framework": {{
      "through_my_lens": "Deep analysis from your theoretical perspective",
      "key_concepts": ["Concept 1 from your field", "Concept 2", "Concept 3"],
      "clinical_observations": "What you notice that others might miss"
    }},
    "family_dynamics": {{
      "roles_observed": "Family roles you identify in THIS incident",
      "power_dynamics": "Power structures evident in THIS interaction",
      "communication_patterns": "Communication styles shown HERE",
      "emotional_rules": "Unspoken emotional rules in THIS family"
    }},
    "deeper_exploration": {{
      "questions_raised": [{questions}],
      "hypotheses": "Working hypotheses about this dynamic",
      "areas_for_investigation": ["What to explore further", "What patterns to track", "What to notice"]
    }},
    "therapeutic_implications": "If this were a client, what would your approach focus on?"
  }},
  "connections_to_explore": "Themes you want to discuss with {peers}",
  "word_count": {word_target}
}}

Write at least {word_target} words total. Be thorough, nuanced, and specific to YOUR theoretical orientation.
Focus on THIS SPECIFIC family incident, not general family dynamics."#,
        name = profile.display_name,
        credentials = profile.credentials,
        boundaries = ANALYSIS_BOUNDARIES,
        expertise = profile.expertise,
        focus = profile.focus_areas.join(", "),
        style = profile.style,
        role = profile.id,
        questions = questions.join(", "),
        peers = peers.join(" and "),
    );

    Ok(Prompt::new(TEAM_SYSTEM_PROMPT, user))
}

pub(super) fn cross_commentary(
    fields: &Fields,
    profile: &RoleProfile,
    roster: &Roster,
) -> Result<Prompt, PromptError> {
    let incident = fields.text("/entry/moment/raw_text")?;
    let analyses = fields.non_empty_array("/analyses")?;
    let peers = peer_names(profile, roster)?;

    let colleague_blocks: Vec<String> = analyses
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let analysis = fields.nested(a, format!("analyses[{}]", i));
            format!(
                "{} ({}):\n{}",
                analysis.text_or("/speakerName", "A colleague"),
                analysis.text_or("/roleId", "unknown role"),
                analysis.text_or("/summary", "(no summary available)"),
            )
        })
        .collect();

    let user = format!(
        r#"You are {name}, {credentials}.

{boundaries}

You've just read your colleagues' analyses of this family dynamic:

ORIGINAL INCIDENT:
{incident}

YOUR COLLEAGUES' ANALYSES:
{colleagues}

Now provide your RESPONSE to their analyses, particularly to {peers}.

Format as JSON:
{{
  "professional": "{role}",
  "speaker_name": "{name}",
  "responding_to": ["List who you're specifically responding to"],
  "commentary": {{
    "agreements": {{
      "with_whom": "Which colleague",
      "what_resonates": "What in their analysis aligns with your perspective",
      "how_it_connects": "How their observation connects to your theoretical framework"
    }},
    "expansions": {{
      "building_on": "Whose analysis you're expanding",
      "additional_layer": "What your lens adds that they might not see",
      "integration": "How your perspectives combine for deeper understanding"
    }},
    "gentle_challenges": {{
      "alternative_view": "Where you see it differently",
      "your_hypothesis": "Your alternative explanation using your framework",
      "both_and": "How both perspectives might be true"
    }},
    "cross_theoretical_insights": {{
      "synthesis": "What emerges when we combine our lenses",
      "new_questions": ["Questions that arise from our combined analysis"],
      "deeper_pattern": "A pattern visible only through multiple lenses"
    }}
  }},
  "collaborative_hypothesis": "A hypothesis we could explore together about this family system",
  "next_direction": "Where our combined analysis points for further exploration"
}}

Engage genuinely with your colleagues' ideas while maintaining your theoretical stance."#,
        name = profile.display_name,
        credentials = profile.credentials,
        boundaries = ANALYSIS_BOUNDARIES,
        colleagues = colleague_blocks.join("\n\n"),
        peers = peers.join(" and "),
        role = profile.id,
    );

    Ok(Prompt::new(TEAM_SYSTEM_PROMPT, user))
}

pub(super) fn team_checkpoint(fields: &Fields) -> Result<Prompt, PromptError> {
    let entries = fields.non_empty_array("/entries")?;

    let newest = fields.nested(&entries[0], "entries[0]".to_string());
    let oldest = fields.nested(&entries[entries.len() - 1], format!("entries[{}]", entries.len() - 1));
    let start = oldest.text_or("/createdAt", "unknown date");
    let end = newest.text_or("/createdAt", "unknown date");

    let mut incidents = Vec::new();
    for (i, e) in entries.iter().take(10).enumerate() {
        let entry = fields.nested(e, format!("entries[{}]", i));
        incidents.push(format!(
            "- {}: {}",
            entry.text_or("/title", "Untitled"),
            excerpt(&entry.text("/moment/raw_text")?, 150),
        ));
    }

    let themes: Vec<String> = fields
        .optional_array("/previousAnalyses")
        .iter()
        .map(|a| {
            let who = a
                .get("professional")
                .or_else(|| a.get("roleId"))
                .map(render)
                .unwrap_or_else(|| "team".to_string());
            let pattern = a
                .pointer("/analysis/pattern_identification/primary_pattern")
                .map(render)
                .unwrap_or_else(|| "no primary pattern recorded".to_string());
            format!("- {}: {}", who, pattern)
        })
        .collect();

    let user = format!(
        r#"As the full research team, create a CHECKPOINT SYNTHESIS of patterns across multiple entries.

{boundaries}

ENTRIES ANALYZED: {count} family incidents
TIME PERIOD: {start} to {end}

KEY INCIDENTS:
{incidents}

PREVIOUS TEAM ANALYSES THEMES:
{themes}

Create a CHECKPOINT REPORT:
{{
  "checkpoint_type": "team_synthesis",
  "period_analyzed": {{ "start_date": "{start}", "end_date": "{end}", "total_entries": {count} }},
  "team_consensus": {{
    "agreed_patterns": [
      {{ "pattern": "Pattern all team members see", "evidence_across_entries": ["Examples"], "theoretical_agreement": "Why all perspectives validate this" }}
    ],
    "divergent_views": [
      {{ "pattern": "Pattern seen differently", "psychodynamic_view": "", "family_systems_view": "", "somatic_view": "", "value_of_divergence": "What we learn from these different views" }}
    ]
  }},
  "evolution_over_time": {{
    "patterns_intensifying": ["Patterns getting stronger with evidence"],
    "patterns_softening": ["Patterns decreasing with evidence"],
    "new_patterns_emerging": ["Patterns just starting to appear"],
    "stable_patterns": ["Unchanging patterns across time"]
  }},
  "family_system_map": {{
    "central_dynamics": "Core family dynamics across all entries",
    "key_players": "Family members most involved in patterns (ONLY those mentioned)",
    "emotional_rules": "Consistent emotional rules across incidents",
    "power_structures": "Recurring power dynamics",
    "communication_patterns": "Persistent communication styles"
  }},
  "theoretical_integration": {{
    "psychodynamic_themes": "",
    "systemic_patterns": "",
    "somatic_patterns": "",
    "cognitive_patterns": "",
    "biological_considerations": ""
  }},
  "research_implications": {{
    "gaps_in_understanding": "What we still don't know",
    "areas_for_deeper_exploration": "What to pay attention to in future entries",
    "questions_for_reflection": "Questions for you to consider",
    "patterns_to_track": "Specific patterns to monitor going forward"
  }},
  "checkpoint_narrative": "A narrative summary of this period written as a team, as engaging prose rather than clinical notes"
}}"#,
        boundaries = ANALYSIS_BOUNDARIES,
        count = entries.len(),
        incidents = incidents.join("\n"),
        themes = if themes.is_empty() {
            "- none recorded".to_string()
        } else {
            themes.join("\n")
        },
    );

    Ok(Prompt::new(TEAM_SYSTEM_PROMPT, user))
}
