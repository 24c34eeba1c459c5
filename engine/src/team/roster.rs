//! Research team roster
//!
//! The five professional perspectives that analyze an entry, and the
//! "responds to" graph that decides who comments on whom in phase two.

use crate::prompt::PromptError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Identifier of a professional perspective on the team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    PsychodynamicAnalyst,
    FamilySystemsTherapist,
    SomaticSpecialist,
    CbtAnalyst,
    PsychiatricConsultant,
}

impl RoleId {
    pub const ALL: [RoleId; 5] = [
        RoleId::PsychodynamicAnalyst,
        RoleId::FamilySystemsTherapist,
        RoleId::SomaticSpecialist,
        RoleId::CbtAnalyst,
        RoleId::PsychiatricConsultant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleId::PsychodynamicAnalyst => "psychodynamic_analyst",
            RoleId::FamilySystemsTherapist => "family_systems_therapist",
            RoleId::SomaticSpecialist => "somatic_specialist",
            RoleId::CbtAnalyst => "cbt_analyst",
            RoleId::PsychiatricConsultant => "psychiatric_consultant",
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleId {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| PromptError::UnknownRole(s.to_string()))
    }
}

/// One professional perspective
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleProfile {
    pub id: RoleId,
    pub display_name: String,
    pub credentials: String,
    pub expertise: String,
    pub focus_areas: Vec<String>,
    pub style: String,
    pub questions: Vec<String>,
    pub responds_to: Vec<RoleId>,
    pub min_word_target: u32,
}

/// Validated, ordered set of role profiles
///
/// Order is significant: phase results are reported in roster order.
#[derive(Debug, Clone)]
pub struct Roster {
    profiles: Vec<RoleProfile>,
}

impl Roster {
    /// Build a roster, checking that it is non-empty, has no duplicate ids,
    /// and that every `responds_to` id resolves to another member.
    pub fn new(profiles: Vec<RoleProfile>) -> Result<Self, PromptError> {
        if profiles.is_empty() {
            return Err(PromptError::InvalidRoster(
                "roster has no members".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for profile in &profiles {
            if !ids.insert(profile.id) {
                return Err(PromptError::InvalidRoster(format!(
                    "{} appears more than once",
                    profile.id
                )));
            }
        }

        for profile in &profiles {
            for peer in &profile.responds_to {
                if *peer == profile.id {
                    return Err(PromptError::InvalidRoster(format!(
                        "{} responds to itself",
                        profile.id
                    )));
                }
                if !ids.contains(peer) {
                    return Err(PromptError::InvalidRoster(format!(
                        "{} responds to {}, which is not on the roster",
                        profile.id, peer
                    )));
                }
            }
        }

        Ok(Self { profiles })
    }

    /// Look up a member
    pub fn get(&self, id: RoleId) -> Option<&RoleProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Look up a member, failing with `UnknownRole`
    pub fn profile(&self, id: RoleId) -> Result<&RoleProfile, PromptError> {
        self.get(id)
            .ok_or_else(|| PromptError::UnknownRole(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleProfile> {
        self.profiles.iter()
    }

    pub fn ids(&self) -> Vec<RoleId> {
        self.profiles.iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            profiles: default_profiles(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_profiles() -> Vec<RoleProfile> {
    vec![
        RoleProfile {
            id: RoleId::PsychodynamicAnalyst,
            display_name: "Dr. Sarah Chen".to_string(),
            credentials: "PsyD, Psychoanalytic Training".to_string(),
            expertise: "unconscious patterns, attachment dynamics, defense mechanisms, transference and countertransference".to_string(),
            focus_areas: strings(&[
                "early attachment patterns",
                "repetition compulsion",
                "internalized object relations",
                "defensive structures",
            ]),
            style: "reflective and interpretive, uses metaphor, connects to deeper patterns".to_string(),
            questions: strings(&[
                "What might this pattern be protecting you from knowing?",
                "How does this mirror earlier relationships?",
                "What unconscious needs might be at play?",
            ]),
            responds_to: vec![RoleId::FamilySystemsTherapist, RoleId::SomaticSpecialist],
            min_word_target: 1200,
        },
        RoleProfile {
            id: RoleId::FamilySystemsTherapist,
            display_name: "Dr. Marcus Williams".to_string(),
            credentials: "LMFT, Bowen Theory Specialist".to_string(),
            expertise: "multigenerational patterns, triangulation, differentiation, family roles and rules".to_string(),
            focus_areas: strings(&[
                "emotional triangles",
                "cutoffs",
                "family projection process",
                "sibling position",
                "multigenerational transmission",
            ]),
            style: "systemic and curious about patterns, maps relationships, thinks in generations".to_string(),
            questions: strings(&[
                "Who else in the family system holds this role?",
                "How many generations back does this pattern go?",
                "What happens to the system when someone breaks this rule?",
            ]),
            responds_to: vec![RoleId::PsychodynamicAnalyst, RoleId::CbtAnalyst],
            min_word_target: 1200,
        },
        RoleProfile {
            id: RoleId::SomaticSpecialist,
            display_name: "Dr. Amara Okonkwo".to_string(),
            credentials: "PhD, Somatic Experiencing Practitioner".to_string(),
            expertise: "embodied trauma, nervous system regulation, body memories, physiological patterns".to_string(),
            focus_areas: strings(&[
                "autonomic nervous system states",
                "body armoring",
                "trauma responses",
                "embodied emotions",
                "interoception",
            ]),
            style: "body-focused and present-oriented, attentive to sensation and movement".to_string(),
            questions: strings(&[
                "Where does this live in your body?",
                "What happens in your nervous system during these interactions?",
                "How does your body know this pattern?",
            ]),
            responds_to: vec![RoleId::PsychodynamicAnalyst, RoleId::PsychiatricConsultant],
            min_word_target: 800,
        },
        RoleProfile {
            id: RoleId::CbtAnalyst,
            display_name: "Dr. James Park".to_string(),
            credentials: "PhD, CBT/DBT Certified".to_string(),
            expertise: "cognitive distortions, behavioral patterns, thought-emotion-behavior cycles, schemas".to_string(),
            focus_areas: strings(&[
                "automatic thoughts",
                "core beliefs",
                "cognitive distortions",
                "behavioral reinforcement",
                "schema patterns",
            ]),
            style: "structured and evidence-focused, practical, identifies patterns and cycles".to_string(),
            questions: strings(&[
                "What evidence supports or contradicts this belief?",
                "What would you tell a friend in this situation?",
                "How is this thought pattern maintaining the problem?",
            ]),
            responds_to: vec![RoleId::FamilySystemsTherapist, RoleId::PsychiatricConsultant],
            min_word_target: 1000,
        },
        RoleProfile {
            id: RoleId::PsychiatricConsultant,
            display_name: "Dr. Elena Volkov".to_string(),
            credentials: "MD, Board Certified Psychiatrist".to_string(),
            expertise: "neurobiological factors, diagnostic patterns, medication considerations, medical rule-outs".to_string(),
            focus_areas: strings(&[
                "neurotransmitter systems",
                "genetic vulnerabilities",
                "diagnostic criteria",
                "biological markers",
                "psychopharmacology",
            ]),
            style: "medical and precise, focused on differential diagnosis through a biological lens".to_string(),
            questions: strings(&[
                "What biological factors might contribute?",
                "Are there patterns suggesting a diagnosable condition?",
                "How might neurochemistry influence this dynamic?",
            ]),
            responds_to: vec![RoleId::SomaticSpecialist, RoleId::CbtAnalyst],
            min_word_target: 800,
        },
    ]
}
