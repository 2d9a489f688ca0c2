//! Fixed question topics

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Question topics asked about a log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Topic {
    BasicEvents = 1,
    ContentSummary = 2,
    PatternsErrorsAnomalies = 3,
    Conclusions = 4,
    MultipleChoice = 5,
}

/// Worked example placed ahead of the real logs
#[derive(Debug, Clone)]
pub struct OneShotExample {
    pub logs: Value,
    pub answer: &'static str,
}

impl Topic {
    pub fn all() -> Vec<Topic> {
        vec![
            Topic::BasicEvents,
            Topic::ContentSummary,
            Topic::PatternsErrorsAnomalies,
            Topic::Conclusions,
            Topic::MultipleChoice,
        ]
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Topic::BasicEvents),
            2 => Some(Topic::ContentSummary),
            3 => Some(Topic::PatternsErrorsAnomalies),
            4 => Some(Topic::Conclusions),
            5 => Some(Topic::MultipleChoice),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// Title as used in ground-truth files and stored responses
    pub fn title(&self) -> &'static str {
        match self {
            Topic::BasicEvents => "Topic 1 - Basic Events",
            Topic::ContentSummary => "Topic 2 - Content Summary",
            Topic::PatternsErrorsAnomalies => "Topic 3 - Patterns, Errors or Anomalies",
            Topic::Conclusions => "Topic 4 - Conclusions",
            Topic::MultipleChoice => "Topic 5 - Multiple Choice Questions",
        }
    }

    /// Directory name for stored responses: `topic_1_-_basic_events`
    pub fn slug(&self) -> String {
        self.title().replace(' ', "_").to_lowercase()
    }

    pub fn from_title(title: &str) -> Option<Self> {
        Self::all().into_iter().find(|t| t.title() == title)
    }

    pub fn questions(&self) -> &'static [&'static str] {
        match self {
            Topic::BasicEvents => &[
                "How many events are in the log file summing the count field?",
                "How many different agents appear and what are their names?",
                "Which type of event is the most critical according to its level?",
                "Which event is repeated the most times?",
            ],
            Topic::ContentSummary => &["Summarize in one line what is happening in the system."],
            Topic::PatternsErrorsAnomalies => &[
                "Do you detect any anomalous behavior in these logs?",
                "Are there failed access attempts? Which alert indicates this?",
                "Are there problematic files? Which ones?",
            ],
            Topic::Conclusions => &[
                "What could be causing the observed errors?",
                "Suggest possible solutions for the detected errors.",
                "Are there signs of any type of attack? Which one(s)?",
                "What would be your general diagnosis of the system state according to these logs?",
            ],
            Topic::MultipleChoice => &[
                "What type of attack is detected in multiple log entries?\nA) Port scan\nB) Denial of Service (DoS)\nC) SSH brute force\nD) SQL injection\nE) None of the above",
                "Which file was identified with multiple malicious YARA rules?\nA) /etc/passwd\nB) /home/mirai\nC) /var/log/auth.log\nD) /home/unknown\nE) None of the above",
                "What is the highest severity level of the events detected by YARA rules?\nA) 3\nB) 12\nC) 7\nD) 10\nE) None of the above",
                "What is the most critical event related to sshd?\nA) Successful password change\nB) Authorized root access\nC) Failed brute-force authentication\nD) Session closed\nE) None of the above",
                "Which agent is logging all the events?\nA) agent-centos\nB) agent-debian\nC) agent-ubuntu\nD) agent-fedora\nE) None of the above",
                "What type of files were detected as malicious by YARA rules?\nA) .docx files\nB) .conf files\nC) Suspicious files in /home/\nD) System executable files\nE) None of the above",
            ],
        }
    }

    /// Answer template the model is asked to follow
    pub fn response_style(&self) -> &'static str {
        match self {
            Topic::BasicEvents => concat!(
                "Answer briefly and directly. Use the following format exclusively without adding extra:\n",
                "There are X events.\n",
                "There are Y agents: name1, name2...\n",
                "The most critical event is DESCRIPTION with level N.\n\n",
                "The most repeated event is DESCRIPTION , N times\n\n",
            ),
            Topic::ContentSummary => "Be as precise as possible, do not add an introduction\n",
            Topic::PatternsErrorsAnomalies => concat!(
                "Answer briefly and directly, omit unnecessary characters, and write in one line without introduction. Use the following format:\n",
                "Choose Yes or No and explain what it is\n",
                "Choose Yes or No and indicate which alert\n",
                "List problematic file names\n\n",
            ),
            Topic::Conclusions => concat!(
                "Answer using this template format as briefly as possible, omitting unnecessary characters and without an introduction, in one line:\n",
                "Possible cause of errors: ...\n",
                "Suggested solutions: ...\n",
                "Signs of attack: Yes/No, type: ...\n",
                "General diagnosis: ...\n\n",
            ),
            // Deliberately English, like the other topics.
            Topic::MultipleChoice => concat!(
                "Answer only with the letter for each question, without justification, omitting unnecessary characters and writing directly:\n",
                "1: A/B/C/D/E\n",
                "2: A/B/C/D/E\n",
                "3: A/B/C/D/E\n",
                "4: A/B/C/D/E\n",
                "5: A/B/C/D/E\n",
                "6: A/B/C/D/E\n",
            ),
        }
    }

    pub fn one_shot(&self) -> Option<OneShotExample> {
        match self {
            Topic::BasicEvents => Some(OneShotExample {
                logs: json!([
                    {
                        "timestamp": 1749969974273_i64,
                        "agent.name": "clavo.ugr.es",
                        "rule.level": 11,
                        "rule.id": 521,
                        "rule.description": "Possible kernel level rootkit",
                        "count": 6
                    },
                    {
                        "timestamp": 1749465036918_i64,
                        "agent.name": "hera.ugr.es",
                        "rule.level": 10,
                        "rule.id": 2502,
                        "rule.description": "syslog: User missed the password more than one time",
                        "count": 1
                    },
                    {
                        "timestamp": 1750758711146_i64,
                        "agent.name": "hera.ugr.es",
                        "rule.level": 10,
                        "rule.id": 80711,
                        "rule.description": "Auditd: Process ended abnormally.",
                        "count": 1
                    }
                ]),
                // Deliberately matches the Topic 1 template (", N times").
                answer: concat!(
                    "There are 8 events.\n",
                    "There are 2 agents: clavo.ugr.es, hera.ugr.es\n",
                    "The most critical event is Possible kernel level rootkit with level 11.\n",
                    "The most repeated event is Possible kernel level rootkit , 6 times\n",
                ),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u8>() {
            return Topic::from_number(n).ok_or_else(|| format!("Unknown topic: {}", s));
        }
        Topic::all()
            .into_iter()
            .find(|t| t.title().eq_ignore_ascii_case(s) || t.slug() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown topic: {}", s))
    }
}

/// Parse `all` or a comma-separated list of topics
pub fn parse_topic_list(spec: &str) -> Result<Vec<Topic>, String> {
    if spec.trim().eq_ignore_ascii_case("all") {
        return Ok(Topic::all());
    }

    let mut topics = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let topic: Topic = part.parse()?;
        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }

    if topics.is_empty() {
        return Err("No topics selected".to_string());
    }
    Ok(topics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_counts() {
        let counts: Vec<usize> = Topic::all().iter().map(|t| t.questions().len()).collect();
        assert_eq!(counts, vec![4, 1, 3, 4, 6]);
    }

    #[test]
    fn test_slug() {
        assert_eq!(Topic::BasicEvents.slug(), "topic_1_-_basic_events");
        assert_eq!(
            Topic::PatternsErrorsAnomalies.slug(),
            "topic_3_-_patterns,_errors_or_anomalies"
        );
        assert_eq!(Topic::MultipleChoice.slug(), "topic_5_-_multiple_choice_questions");
    }

    #[test]
    fn test_from_str_variants() {
        assert_eq!("2".parse::<Topic>().unwrap(), Topic::ContentSummary);
        assert_eq!("Topic 4 - Conclusions".parse::<Topic>().unwrap(), Topic::Conclusions);
        assert_eq!("topic_1_-_basic_events".parse::<Topic>().unwrap(), Topic::BasicEvents);
        assert!("9".parse::<Topic>().is_err());
        assert!("Topic 9".parse::<Topic>().is_err());
    }

    #[test]
    fn test_from_title_roundtrip() {
        for topic in Topic::all() {
            assert_eq!(Topic::from_title(topic.title()), Some(topic));
            assert_eq!(Topic::from_number(topic.number()), Some(topic));
        }
    }

    #[test]
    fn test_parse_topic_list() {
        assert_eq!(parse_topic_list("all").unwrap().len(), 5);
        assert_eq!(
            parse_topic_list("3, 1,3").unwrap(),
            vec![Topic::PatternsErrorsAnomalies, Topic::BasicEvents]
        );
        assert!(parse_topic_list(" , ").is_err());
        assert!(parse_topic_list("1,7").is_err());
    }

    #[test]
    fn test_only_basic_events_has_one_shot() {
        let example = Topic::BasicEvents.one_shot().unwrap();
        let logs = example.logs.as_array().unwrap();
        let total: i64 = logs.iter().map(|l| l["count"].as_i64().unwrap()).sum();
        assert_eq!(total, 8);
        assert!(example.answer.starts_with("There are 8 events."));

        for topic in Topic::all().into_iter().skip(1) {
            assert!(topic.one_shot().is_none());
        }
    }

    #[test]
    fn test_one_shot_answer_follows_template() {
        let answer = Topic::BasicEvents.one_shot().unwrap().answer;
        assert_eq!(
            answer.lines().last(),
            Some("The most repeated event is Possible kernel level rootkit , 6 times")
        );
        assert!(Topic::BasicEvents
            .response_style()
            .contains("The most repeated event is DESCRIPTION , N times"));
        assert!(Topic::MultipleChoice
            .response_style()
            .starts_with("Answer only with the letter for each question"));
    }
}
