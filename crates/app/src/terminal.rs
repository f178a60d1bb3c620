//! Line-oriented front end over the session controller.

use std::sync::Arc;

use services::{FamilyService, QuizTick, SessionController};
use tokio::io::{AsyncBufReadExt, BufReader};
use tutor_core::model::{FamilyId, Language, Message, StoryAction, Subject, ViewState};
use tutor_core::quiz_engine::AnswerFeedback;

const HELP: &str = "\
Type anything to chat. Commands:
  /subject <name> [topic]   pick a subject, optionally with a quiz topic
  /ask                      chat about the offered topic instead
  /quiz                     start a quiz about the offered topic
  /play                     play the latest quiz offered in the chat
  <n> or /answer <n>        answer the current question (1-based)
  /next                     skip the rest of the feedback pause
  /back  /forward  /home    navigate
  /lang <code>              switch language (en hi te ta kn ml gu bn)
  /challenge                accept the latest challenge
  /story start|next|done    follow the latest story
  /speak <text>             read text aloud
  /translate <text>         translate into the session language
  /feedback <1-5> [comment] rate the tutor
  /family create <name> | join <id> | show <id>
  /progress  /logout  /help  /quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Chat(String),
    Subject { subject: Subject, topic: Option<String> },
    Ask,
    Quiz,
    Play,
    Answer(usize),
    Next,
    Back,
    Forward,
    Home,
    Language(Language),
    Challenge,
    Story(StoryAction),
    Speak(String),
    Translate(String),
    Feedback { rating: Option<u8>, comment: Option<String> },
    FamilyCreate(String),
    FamilyJoin(FamilyId),
    FamilyShow(FamilyId),
    Progress,
    Logout,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl Command {
    fn parse(line: &str, in_quiz: bool) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if in_quiz {
            if let Ok(number) = line.parse::<usize>() {
                return answer(number);
            }
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Chat(line.to_owned());
        };

        let (name, arg) = rest.split_once(' ').unwrap_or((rest, ""));
        let arg = arg.trim();
        match name {
            "subject" => {
                let (subject, topic) = arg.split_once(' ').unwrap_or((arg, ""));
                match subject.parse() {
                    Ok(subject) => Self::Subject {
                        subject,
                        topic: Some(topic.trim().to_owned()).filter(|topic| !topic.is_empty()),
                    },
                    Err(err) => Self::Invalid(err.to_string()),
                }
            }
            "ask" => Self::Ask,
            "quiz" => Self::Quiz,
            "play" => Self::Play,
            "answer" => arg
                .parse::<usize>()
                .map_or_else(|_| Self::Invalid(format!("not a number: {arg}")), answer),
            "next" => Self::Next,
            "back" => Self::Back,
            "forward" => Self::Forward,
            "home" => Self::Home,
            "lang" => match arg.parse::<Language>() {
                Ok(language) => Self::Language(language),
                Err(err) => Self::Invalid(err.to_string()),
            },
            "challenge" => Self::Challenge,
            "story" => match arg {
                "start" => Self::Story(StoryAction::StartReading),
                "next" => Self::Story(StoryAction::NextPage),
                "done" => Self::Story(StoryAction::StoryComplete),
                other => Self::Invalid(format!("unknown story action: {other}")),
            },
            "speak" => Self::Speak(arg.to_owned()),
            "translate" => Self::Translate(arg.to_owned()),
            "feedback" => {
                let (first, comment) = arg.split_once(' ').unwrap_or((arg, ""));
                match first.parse::<u8>() {
                    Ok(rating) => Self::Feedback {
                        rating: Some(rating),
                        comment: Some(comment.trim().to_owned()).filter(|c| !c.is_empty()),
                    },
                    Err(_) => Self::Feedback {
                        rating: None,
                        comment: Some(arg.to_owned()).filter(|c| !c.is_empty()),
                    },
                }
            }
            "family" => {
                let (action, value) = arg.split_once(' ').unwrap_or((arg, ""));
                let value = value.trim();
                match action {
                    "create" => Self::FamilyCreate(value.to_owned()),
                    "join" | "show" => match value.parse::<FamilyId>() {
                        Ok(id) if action == "join" => Self::FamilyJoin(id),
                        Ok(id) => Self::FamilyShow(id),
                        Err(err) => Self::Invalid(err.to_string()),
                    },
                    other => Self::Invalid(format!("unknown family action: {other}")),
                }
            }
            "progress" => Self::Progress,
            "logout" => Self::Logout,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("unknown command: /{other}")),
        }
    }
}

fn answer(number: usize) -> Command {
    match number.checked_sub(1) {
        Some(index) => Command::Answer(index),
        None => Command::Invalid("answers start at 1".into()),
    }
}

enum Event {
    Line(std::io::Result<Option<String>>),
    DwellOver,
}

pub struct Terminal {
    session: SessionController,
    families: Arc<FamilyService>,
    shown: usize,
}

impl Terminal {
    pub fn new(session: SessionController, families: Arc<FamilyService>) -> Self {
        Self {
            session,
            families,
            shown: 0,
        }
    }

    /// Read commands from stdin until EOF or `/quit`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if stdin cannot be read.
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("{HELP}");
        self.print_new_messages();

        loop {
            let event = tokio::select! {
                line = lines.next_line() => Event::Line(line),
                _ = self.session.feedback_elapsed() => Event::DwellOver,
            };
            match event {
                Event::Line(line) => {
                    let Some(line) = line? else { break };
                    let command = Command::parse(&line, self.session.quiz_run().is_some());
                    if command == Command::Quit {
                        break;
                    }
                    self.handle(command).await;
                }
                Event::DwellOver => {
                    let tick = self.session.advance_quiz();
                    self.show_tick(tick);
                }
            }
            self.print_new_messages();
        }

        self.session.flush().await;
        Ok(())
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Chat(text) => {
                self.session.send_message(&text, false).await;
            }
            Command::Subject { subject, topic } => {
                self.session.change_subject(subject, topic.as_deref());
                self.show_view();
            }
            Command::Ask => {
                if !self.session.ask_question() {
                    println!("(no topic on offer; use /subject <name> <topic>)");
                }
            }
            Command::Quiz => {
                if !matches!(self.session.view(), ViewState::TopicPrompt { .. }) {
                    println!("(pick a topic first with /subject <name> <topic>)");
                    return;
                }
                let source = self.session.start_quiz_from_topic().await;
                println!("(quiz ready: {source:?})");
                self.show_question();
            }
            Command::Play => {
                let Some(prompt) = self.session.latest_quiz_prompt().cloned() else {
                    println!("(no quiz has been offered yet)");
                    return;
                };
                if self.session.start_quiz_from_prompt(&prompt.quiz_id) {
                    self.show_question();
                }
            }
            Command::Answer(index) => match self.session.submit_answer(index) {
                Some(feedback) => self.show_feedback(feedback),
                None => println!("(that answer cannot be taken now)"),
            },
            Command::Next => {
                let tick = self.session.advance_quiz();
                self.show_tick(tick);
            }
            Command::Back => {
                if self.session.back() {
                    self.show_view();
                }
            }
            Command::Forward => {
                if self.session.forward() {
                    self.show_view();
                }
            }
            Command::Home => {
                self.session.go_home();
                self.show_view();
            }
            Command::Language(language) => self.session.change_language(language),
            Command::Challenge => self.session.accept_challenge(),
            Command::Story(action) => self.session.story_action(action),
            Command::Speak(text) => match self.session.speak(&text).await {
                Ok(clip) => println!("(audio: {} bytes of {})", clip.bytes.len(), clip.content_type),
                Err(notice) => println!("({notice})"),
            },
            Command::Translate(text) => println!("{}", self.session.translate(&text).await),
            Command::Feedback { rating, comment } => {
                if let Err(notice) = self
                    .session
                    .submit_feedback(rating, comment.as_deref())
                    .await
                {
                    println!("({notice})");
                }
            }
            Command::FamilyCreate(name) => {
                let Some(learner) = self.session.learner().map(|l| l.id().clone()) else {
                    println!("(sign in with --email to use families)");
                    return;
                };
                match self.families.create_family(&name, &learner).await {
                    Ok(family) => println!("(family {} created: {})", family.id(), family.name()),
                    Err(err) => println!("({err})"),
                }
            }
            Command::FamilyJoin(id) => {
                let Some(learner) = self.session.learner().map(|l| l.id().clone()) else {
                    println!("(sign in with --email to use families)");
                    return;
                };
                match self.families.join_family(id, &learner).await {
                    Ok(family) => println!("(joined {}, {} members)", family.name(), family.members().len()),
                    Err(err) => println!("({err})"),
                }
            }
            Command::FamilyShow(id) => match self.families.dashboard(id).await {
                Ok(dashboard) => {
                    println!("Family {} ({} points)", dashboard.family.name(), dashboard.total_points());
                    for member in &dashboard.members {
                        let name = member
                            .profile
                            .as_ref()
                            .map_or(member.user_id.as_str(), |profile| profile.name());
                        println!(
                            "  {name}: level {}, {} points, streak {}",
                            member.progress.level(),
                            member.progress.total_points(),
                            member.progress.streak()
                        );
                    }
                }
                Err(err) => println!("({err})"),
            },
            Command::Progress => {
                let progress = self.session.progress();
                println!(
                    "Level {} | {} points | streak {} | {} quizzes | {} challenges",
                    progress.level(),
                    progress.total_points(),
                    progress.streak(),
                    progress.quizzes_completed(),
                    progress.completed_challenges()
                );
                for (subject, stats) in progress.subjects() {
                    println!(
                        "  {subject}: {} points, average {}%",
                        stats.points(),
                        stats.average_score()
                    );
                }
            }
            Command::Logout => self.session.logout(),
            Command::Help => println!("{HELP}"),
            Command::Invalid(reason) => println!("({reason})"),
            Command::Empty | Command::Quit => {}
        }
    }

    fn print_new_messages(&mut self) {
        let messages = self.session.messages();
        if messages.len() < self.shown {
            self.shown = 0;
        }
        for message in &messages[self.shown..] {
            print_message(message);
        }
        self.shown = messages.len();
    }

    fn show_view(&self) {
        match self.session.view() {
            ViewState::Home => println!("[home] subjects: {}", subject_list()),
            ViewState::TopicPrompt { subject, topic } => {
                println!("[{subject}] {topic}: /quiz to take a quiz, /ask to chat about it");
            }
            ViewState::ChatSummary { subject, topic } => {
                let topics = subject.topics().join(", ");
                match topic {
                    Some(topic) => println!("[{subject} / {topic}] chatting"),
                    None if topics.is_empty() => println!("[{subject}] chatting"),
                    None => println!("[{subject}] chatting; topics: {topics}"),
                }
            }
            ViewState::QuizActive { subject, .. } => {
                println!("[{subject}] quiz");
                match quiz_restored_hint(self.session.quiz_run().is_some()) {
                    Some(hint) => println!("{hint}"),
                    None => self.show_question(),
                }
            }
        }
    }

    fn show_question(&self) {
        let Some(run) = self.session.quiz_run() else {
            return;
        };
        let Some(question) = run.current_question() else {
            return;
        };
        println!(
            "Question {}/{}: {}",
            run.current_index() + 1,
            run.question_count(),
            question.question()
        );
        for (n, option) in question.options().iter().enumerate() {
            println!("  {}. {option}", n + 1);
        }
    }

    fn show_feedback(&self, feedback: AnswerFeedback) {
        match feedback.revealed_correct_index() {
            None => println!("Correct! 🌟"),
            Some(index) => println!("Not quite. The answer was {}.", index + 1),
        }
        if let Some(explanation) = self
            .session
            .quiz_run()
            .and_then(|run| run.quiz().questions().get(feedback.question_index))
            .and_then(|question| question.explanation())
        {
            println!("{explanation}");
        }
    }

    fn show_tick(&self, tick: Option<QuizTick>) {
        if let Some(QuizTick::Next { .. }) = tick {
            self.show_question();
        }
    }
}

fn print_message(message: &Message) {
    let who = if message.is_bot() { "tutor" } else { "you" };
    println!("{who}> {}", message.text());
    if let Some(image) = message.image() {
        println!("      [image] {image}");
    }
    if let Some(story) = message.story() {
        println!("      [story] {} (/story start)", story.title);
    }
    if let Some(challenge) = message.challenge() {
        println!(
            "      [challenge] {}: {} (/challenge)",
            challenge.title, challenge.description
        );
    }
    if let Some(prompt) = message.quiz_prompt() {
        println!("      [quiz] {} (/play)", prompt.topic);
    }
}

fn subject_list() -> String {
    Subject::ALL
        .iter()
        .map(|subject| subject.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A quiz view reached through history has no attempt behind it.
fn quiz_restored_hint(attempt_running: bool) -> Option<&'static str> {
    const HINT: &str = "No quiz is running here. Use /quiz to start one or /back to leave.";
    (!attempt_running).then_some(HINT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_view_without_an_attempt_points_to_quiz_or_back() {
        let hint = quiz_restored_hint(false).unwrap();
        assert!(hint.contains("/quiz"));
        assert!(hint.contains("/back"));
        assert!(quiz_restored_hint(true).is_none());
    }

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(
            Command::parse("  why is the sky blue? ", false),
            Command::Chat("why is the sky blue?".into())
        );
        assert_eq!(Command::parse("   ", false), Command::Empty);
    }

    #[test]
    fn numbers_answer_only_during_a_quiz() {
        assert_eq!(Command::parse("2", true), Command::Answer(1));
        assert_eq!(Command::parse("2", false), Command::Chat("2".into()));
        assert!(matches!(Command::parse("0", true), Command::Invalid(_)));
        assert_eq!(Command::parse("/answer 1", false), Command::Answer(0));
    }

    #[test]
    fn subject_takes_an_optional_multi_word_topic() {
        assert_eq!(
            Command::parse("/subject stories Fairy Tales", false),
            Command::Subject {
                subject: Subject::Stories,
                topic: Some("Fairy Tales".into()),
            }
        );
        assert_eq!(
            Command::parse("/subject Math", false),
            Command::Subject {
                subject: Subject::Math,
                topic: None,
            }
        );
        assert!(matches!(
            Command::parse("/subject cooking", false),
            Command::Invalid(_)
        ));
    }

    #[test]
    fn feedback_rating_is_optional() {
        assert_eq!(
            Command::parse("/feedback 5 loved it", false),
            Command::Feedback {
                rating: Some(5),
                comment: Some("loved it".into()),
            }
        );
        assert_eq!(
            Command::parse("/feedback too hard", false),
            Command::Feedback {
                rating: None,
                comment: Some("too hard".into()),
            }
        );
    }

    #[test]
    fn family_and_language_commands() {
        assert_eq!(
            Command::parse("/family join 3", false),
            Command::FamilyJoin(FamilyId::new(3))
        );
        assert_eq!(
            Command::parse("/family create The Raos", false),
            Command::FamilyCreate("The Raos".into())
        );
        assert_eq!(Command::parse("/lang te", false), Command::Language(Language::Te));
        assert_eq!(Command::parse("/quit", true), Command::Quit);
    }
}
