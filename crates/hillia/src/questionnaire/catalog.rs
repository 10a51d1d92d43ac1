use serde::Serialize;
use std::fmt;

use super::domain::PreferredContact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Single,
    Multiselect,
    Matrix,
    Text,
}

impl QuestionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "single-select",
            Self::Multiselect => "multi-select",
            Self::Matrix => "matrix",
            Self::Text => "free text",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub kind: QuestionKind,
    pub prompt: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_select: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    pub optional: bool,
}

impl Question {
    fn base(id: &'static str, kind: QuestionKind, prompt: &'static str) -> Self {
        Self {
            id,
            kind,
            prompt,
            options: Vec::new(),
            max_select: None,
            rows: Vec::new(),
            columns: Vec::new(),
            placeholder: None,
            optional: false,
        }
    }

    pub fn single(id: &'static str, prompt: &'static str, options: Vec<&'static str>) -> Self {
        Self {
            options,
            ..Self::base(id, QuestionKind::Single, prompt)
        }
    }

    pub fn multiselect(
        id: &'static str,
        prompt: &'static str,
        max_select: usize,
        options: Vec<&'static str>,
    ) -> Self {
        Self {
            options,
            max_select: Some(max_select),
            ..Self::base(id, QuestionKind::Multiselect, prompt)
        }
    }

    pub fn matrix(
        id: &'static str,
        prompt: &'static str,
        rows: Vec<&'static str>,
        columns: Vec<&'static str>,
    ) -> Self {
        Self {
            rows,
            columns,
            ..Self::base(id, QuestionKind::Matrix, prompt)
        }
    }

    pub fn text(id: &'static str, prompt: &'static str) -> Self {
        Self {
            placeholder: Some(""),
            ..Self::base(id, QuestionKind::Text, prompt)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Selection cap for multi-select questions; unbounded for every other kind.
    pub fn selection_cap(&self) -> usize {
        self.max_select.unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    pub label: &'static str,
    pub questions: Vec<Question>,
    pub optional: bool,
}

impl Section {
    pub fn new(
        id: &'static str,
        title: &'static str,
        label: &'static str,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id,
            title,
            label,
            questions,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// The closing step that asks whether the respondent wants to be reachable.
#[derive(Debug, Clone, Serialize)]
pub struct ContactStep {
    pub title: &'static str,
    pub label: &'static str,
    pub consent_prompt: &'static str,
    pub consent_options: [&'static str; 2],
    pub preferred_prompt: &'static str,
    pub preferred_options: [PreferredContact; 4],
    pub email_label: &'static str,
    pub phone_label: &'static str,
}

impl Default for ContactStep {
    fn default() -> Self {
        Self {
            title: "Optional Contact",
            label: "Section J",
            consent_prompt: "Would you like to be contacted for future conversations?",
            consent_options: ["Yes", "Remain anonymous"],
            preferred_prompt: "Preferred means of communication",
            preferred_options: PreferredContact::ordered(),
            email_label: "Email",
            phone_label: "Phone",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionCopy {
    pub title: &'static str,
    pub message: &'static str,
    pub anonymous_message: &'static str,
}

impl Default for CompletionCopy {
    fn default() -> Self {
        Self {
            title: "Submitted",
            message: "Your responses have been received. If there is alignment, you will hear from us. If not, we wish you well in your search.",
            anonymous_message: "Your anonymous responses have been received.",
        }
    }
}

/// Ordered, immutable definition of every step the questionnaire walks through.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionCatalog {
    pub title: &'static str,
    pub intro: &'static str,
    sections: Vec<Section>,
    pub contact: ContactStep,
    pub completion: CompletionCopy,
}

impl QuestionCatalog {
    /// Builds a catalog from ordered sections. Sections without questions are dropped
    /// so every cursor position names a real question.
    pub fn new(sections: Vec<Section>) -> Self {
        let sections = sections
            .into_iter()
            .filter(|section| {
                if section.questions.is_empty() {
                    tracing::debug!(section = section.id, "dropping section without questions");
                    false
                } else {
                    true
                }
            })
            .collect();

        Self {
            title: "Community Fit Questionnaire",
            intro: "A conversation, not a form.",
            sections,
            contact: ContactStep::default(),
            completion: CompletionCopy::default(),
        }
    }

    /// The community-fit questionnaire served on the site.
    pub fn hillia() -> Self {
        Self::new(hillia_sections())
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn question(&self, section_index: usize, question_index: usize) -> Option<&Question> {
        self.section(section_index)
            .and_then(|section| section.questions.get(question_index))
    }

    pub fn find_question(&self, question_id: &str) -> Option<(&Section, &Question)> {
        self.sections.iter().find_map(|section| {
            section
                .questions
                .iter()
                .find(|question| question.id == question_id)
                .map(|question| (section, question))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn total_questions(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.questions.len())
            .sum()
    }

    /// Zero-based position of a question when every section is laid end to end.
    pub fn flat_index(&self, section_index: usize, question_index: usize) -> usize {
        self.sections
            .iter()
            .take(section_index)
            .map(|section| section.questions.len())
            .sum::<usize>()
            + question_index
    }

    /// Cursor coordinates of the final question, if the catalog has any.
    pub fn last_position(&self) -> Option<(usize, usize)> {
        let section_index = self.sections.len().checked_sub(1)?;
        let question_index = self.sections[section_index].questions.len().checked_sub(1)?;
        Some((section_index, question_index))
    }

    pub fn contains_position(&self, section_index: usize, question_index: usize) -> bool {
        self.question(section_index, question_index).is_some()
    }
}

fn hillia_sections() -> Vec<Section> {
    vec![
        Section::new(
            "life-stage",
            "Life Stage & Context",
            "Section A",
            vec![
                Question::single(
                    "q1-life-phase",
                    "Which stage best describes your current life phase?",
                    vec![
                        "Actively building career / enterprise",
                        "Established career / business consolidation",
                        "Transitioning to a slower pace of life",
                        "Semi-retired / retired",
                    ],
                ),
                Question::text(
                    "q2-life-context",
                    "Is there any context you'd like to share about your current phase of life?",
                )
                .optional(),
                Question::single(
                    "q3-household",
                    "Which best describes your household composition?",
                    vec![
                        "Individual / couple",
                        "Couple with young children",
                        "Couple with teenage children",
                        "Empty nest / children living independently",
                    ],
                ),
            ],
        ),
        Section::new(
            "education",
            "Education & Intellectual Orientation",
            "Section B",
            vec![
                Question::single(
                    "q4-education",
                    "Highest level of formal education completed",
                    vec![
                        "Undergraduate",
                        "Postgraduate",
                        "Doctoral / professional specialisation",
                        "Prefer not to specify",
                    ],
                ),
                Question::multiselect(
                    "q5-activities",
                    "Which activities do you naturally gravitate towards in your free time?",
                    3,
                    vec![
                        "Reading / learning",
                        "Arts, music, cinema, culture",
                        "Entrepreneurship / investing / business thinking",
                        "Spiritual or contemplative practices",
                        "Outdoor activities (walking, trekking, nature)",
                        "Hosting small gatherings",
                        "Solitary / quiet pursuits",
                    ],
                ),
            ],
        ),
        Section::new(
            "lifestyle",
            "Lifestyle Rhythm & Social Energy",
            "Section C",
            vec![
                Question::single(
                    "q6-recharge",
                    "Which environment helps you recharge best?",
                    vec![
                        "Silence and solitude",
                        "Quiet surroundings with occasional interaction",
                        "Small, familiar social groups",
                        "Active, socially engaging environments",
                    ],
                ),
                Question::single(
                    "q7-second-home-use",
                    "How do you expect to use a second home in the hills?",
                    vec![
                        "Mostly private retreat",
                        "Occasional social interaction",
                        "Enjoy planned community moments",
                        "Flexible / seasonal",
                    ],
                ),
                Question::single(
                    "q8-hosting",
                    "How often do you expect to host friends or extended family?",
                    vec!["Rarely", "Occasionally", "Regularly", "Seasonally"],
                ),
            ],
        ),
        Section::new(
            "values",
            "Values & Boundaries",
            "Section D",
            vec![
                Question::matrix(
                    "q9-importance",
                    "How important are the following in a shared residential community?",
                    vec![
                        "Privacy",
                        "Silence / low noise",
                        "Order & maintenance",
                        "Respect for common rules",
                        "Environmental sensitivity",
                    ],
                    vec!["Very Important", "Important", "Neutral", "Not Important"],
                ),
                Question::single(
                    "q10-shared-spaces",
                    "In shared spaces, which best reflects your comfort level?",
                    vec![
                        "Prefer minimal shared use",
                        "Comfortable with structured shared use",
                        "Comfortable with informal shared use",
                    ],
                ),
                Question::text(
                    "q11-boundaries",
                    "Any additional thoughts on boundaries or shared living?",
                )
                .optional(),
            ],
        ),
        Section::new(
            "decision-style",
            "Decision-Making & Behavioural Style",
            "Section E",
            vec![
                Question::single(
                    "q12-disagreements",
                    "When disagreements arise, you usually prefer to:",
                    vec![
                        "Adjust quietly",
                        "Discuss and resolve informally",
                        "Use structured processes",
                    ],
                ),
                Question::single(
                    "q13-decisions",
                    "Which best describes how you make decisions?",
                    vec![
                        "Quickly and intuitively",
                        "Carefully and analytically",
                        "In consultation with family / advisors",
                    ],
                ),
                Question::single(
                    "q14-risk",
                    "How do you generally approach risk?",
                    vec!["Conservative", "Balanced", "Experimental"],
                ),
            ],
        ),
        Section::new(
            "pets-children",
            "Pets, Children & Shared Life",
            "Section F",
            vec![
                Question::single(
                    "q15-pets",
                    "Your perspective on pets in residential communities:",
                    vec![
                        "I own pets and value pet-friendly environments",
                        "Comfortable around pets",
                        "Prefer limited pet presence",
                        "Prefer pet-free environments",
                    ],
                ),
                Question::single(
                    "q16-children",
                    "Your comfort with children in shared spaces:",
                    vec![
                        "Comfortable and welcoming",
                        "Comfortable with boundaries",
                        "Prefer limited presence",
                        "Prefer adult-oriented spaces",
                    ],
                ),
            ],
        ),
        Section::new(
            "home-config",
            "Home Configuration & Value",
            "Section G",
            vec![
                Question::single(
                    "q17-configuration",
                    "Which home configurations interest you?",
                    vec!["2 BHK", "3 BHK", "3 BHK + Study", "Villa"],
                ),
                Question::matrix(
                    "q18-budget",
                    "Indicative willingness to spend (non-binding):",
                    vec!["2 BHK", "3 BHK", "3 BHK + Study", "Villa"],
                    vec!["₹2–2.5 Cr", "₹2.5–3.5 Cr", "₹3.5–4.5 Cr", "₹5 Cr+"],
                ),
                Question::multiselect(
                    "q19-features",
                    "Which premium features matter to you?",
                    7,
                    vec![
                        "Lake view",
                        "Forest view",
                        "Isolated / low density",
                        "Personal pool",
                        "Large bathrooms / tubs",
                        "Storage / utility spaces",
                        "Clubhouse access",
                    ],
                ),
            ],
        ),
        Section::new(
            "community-expectations",
            "Community Expectations",
            "Section H",
            vec![
                Question::multiselect(
                    "q20-negative-impact",
                    "What would most negatively impact your experience?",
                    2,
                    vec![
                        "Noise / disturbance",
                        "Poor maintenance",
                        "Unclear rules",
                        "Excessive social intrusion",
                        "Lack of shared values",
                    ],
                ),
                Question::text(
                    "q21-ideal-community",
                    "In one sentence, what kind of community would you most enjoy being part of?",
                ),
            ],
        ),
        Section::new(
            "cultural-signals",
            "Cultural Signals",
            "Section I",
            vec![
                Question::text("q22-last-book", "Last book you read").optional(),
                Question::text("q23-last-film", "Last film / series you watched").optional(),
                Question::text("q24-three-words", "Describe yourself in three words").optional(),
            ],
        )
        .optional(),
    ]
}
