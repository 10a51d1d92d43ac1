use hillia::error::AppError;
use hillia::questionnaire::{
    Acknowledgement, Answer, Navigation, PreferredContact, Question, QuestionKind, Wizard,
    WizardPhase,
};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// How an interactive session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    Completed(Acknowledgement),
    /// Progress is kept on disk and picked up on the next run.
    Paused,
    AlreadySubmitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Back,
    Next,
    Quit,
    Entry(String),
}

fn parse_command(line: &str) -> Command {
    match line.trim() {
        "" | ":n" | ":next" => Command::Next,
        ":b" | ":back" => Command::Back,
        ":q" | ":quit" => Command::Quit,
        other => Command::Entry(other.to_string()),
    }
}

/// Line-oriented front end for the questionnaire wizard.
pub(crate) struct Console<I, O> {
    input: I,
    output: O,
}

impl<I, O> Console<I, O>
where
    I: AsyncBufRead + Unpin,
    O: Write,
{
    pub(crate) fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub(crate) fn into_output(self) -> O {
        self.output
    }

    pub(crate) async fn run(&mut self, wizard: &mut Wizard) -> Result<SessionEnd, AppError> {
        if wizard.phase() == WizardPhase::Completed {
            writeln!(self.output, "This device has already submitted the questionnaire.")?;
            write!(self.output, "Start over? [y/N] ")?;
            self.output.flush()?;
            match self.read_command().await? {
                Some(Command::Entry(answer)) if answer.eq_ignore_ascii_case("y") => {
                    wizard.start_over()?;
                }
                _ => return Ok(SessionEnd::AlreadySubmitted),
            }
        }

        if wizard.phase() == WizardPhase::Landing {
            let catalog = wizard.catalog();
            writeln!(self.output, "{}", catalog.title)?;
            writeln!(self.output, "{}", catalog.intro)?;
            writeln!(
                self.output,
                "Commands: Enter continues, :back goes back, :quit pauses."
            )?;
            write!(self.output, "Press Enter to begin. ")?;
            self.output.flush()?;
            match self.read_command().await? {
                None | Some(Command::Quit) => return Ok(SessionEnd::Paused),
                Some(_) => {
                    wizard.begin();
                }
            }
        } else {
            writeln!(
                self.output,
                "Welcome back. Picking up at {}%.",
                wizard.progress_percent()
            )?;
        }

        loop {
            let step = match wizard.phase() {
                WizardPhase::Landing => {
                    wizard.begin();
                    Step::Continue
                }
                WizardPhase::Answering => self.answer_step(wizard).await?,
                WizardPhase::ContactConsent => self.consent_step(wizard).await?,
                WizardPhase::ContactDetails => self.details_step(wizard).await?,
                WizardPhase::Completed => {
                    let acknowledgement = wizard
                        .acknowledgement()
                        .cloned()
                        .ok_or(hillia::questionnaire::WizardError::Frozen)?;
                    self.print_completion(wizard, &acknowledgement)?;
                    return Ok(SessionEnd::Completed(acknowledgement));
                }
            };

            if step == Step::Pause {
                wizard.record_dropoff();
                writeln!(
                    self.output,
                    "Paused at {}%. Your answers stay on this device.",
                    wizard.progress_percent()
                )?;
                return Ok(SessionEnd::Paused);
            }
        }
    }

    async fn answer_step(&mut self, wizard: &mut Wizard) -> Result<Step, AppError> {
        let view = wizard.view();
        let (Some(heading), Some(question)) = (view.section, view.question) else {
            return Ok(Step::Pause);
        };

        writeln!(self.output)?;
        writeln!(
            self.output,
            "[{:>2}%] {} {}: question {} of {}",
            view.percent, heading.label, heading.title, heading.question_number, heading.question_count
        )?;
        self.print_question(&question, view.answer.as_ref())?;
        write!(self.output, "> ")?;
        self.output.flush()?;

        match self.read_command().await? {
            None | Some(Command::Quit) => Ok(Step::Pause),
            Some(Command::Back) => {
                if wizard.retreat() == Navigation::Unchanged {
                    writeln!(self.output, "Already at the first question.")?;
                }
                Ok(Step::Continue)
            }
            Some(Command::Next) => {
                if wizard.advance() == Navigation::Blocked {
                    writeln!(self.output, "This question needs an answer before moving on.")?;
                }
                Ok(Step::Continue)
            }
            Some(Command::Entry(entry)) => {
                self.apply_entry(wizard, &question, &entry).await?;
                Ok(Step::Continue)
            }
        }
    }

    async fn apply_entry(
        &mut self,
        wizard: &mut Wizard,
        question: &Question,
        entry: &str,
    ) -> Result<(), AppError> {
        match question.kind {
            QuestionKind::Single => match pick(&question.options, entry) {
                Some(option) => {
                    let advance = wizard.select_single(option)?;
                    advance.elapsed().await;
                    wizard.advance();
                }
                None => self.out_of_range(question.options.len())?,
            },
            QuestionKind::Multiselect => {
                let cap = question.selection_cap();
                for token in tokens(entry) {
                    let Some(option) = pick(&question.options, token) else {
                        self.out_of_range(question.options.len())?;
                        continue;
                    };
                    let was_selected = matches!(
                        wizard.responses().get(question.id),
                        Some(Answer::Multiselect(values)) if values.iter().any(|v| v == option)
                    );
                    if !wizard.toggle_multiselect(option)? && !was_selected {
                        writeln!(self.output, "At most {cap} choices; {option} was not added.")?;
                    }
                }
            }
            QuestionKind::Matrix => {
                for token in tokens(entry) {
                    let cell = token
                        .split_once(':')
                        .and_then(|(row, column)| {
                            Some((pick(&question.rows, row)?, pick(&question.columns, column)?))
                        });
                    match cell {
                        Some((row, column)) => wizard.set_matrix_cell(row, column)?,
                        None => writeln!(
                            self.output,
                            "Use row:column pairs such as 1:2, rows 1-{} and columns 1-{}.",
                            question.rows.len(),
                            question.columns.len()
                        )?,
                    }
                }
            }
            QuestionKind::Text => {
                wizard.set_text(entry)?;
                wizard.advance();
            }
        }
        Ok(())
    }

    async fn consent_step(&mut self, wizard: &mut Wizard) -> Result<Step, AppError> {
        let contact = wizard.catalog().contact.clone();
        writeln!(self.output)?;
        writeln!(self.output, "[{:>2}%] {} {}", wizard.progress_percent(), contact.label, contact.title)?;
        writeln!(self.output, "{}", contact.consent_prompt)?;
        for (index, option) in contact.consent_options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", index + 1, option)?;
        }
        write!(self.output, "> ")?;
        self.output.flush()?;

        match self.read_command().await? {
            None | Some(Command::Quit) => Ok(Step::Pause),
            Some(Command::Back) => {
                wizard.retreat();
                Ok(Step::Continue)
            }
            Some(Command::Entry(entry)) if entry == "1" => {
                wizard.choose_contact(true)?;
                Ok(Step::Continue)
            }
            Some(Command::Entry(entry)) if entry == "2" => {
                wizard.choose_contact(false)?;
                self.submit(wizard).await?;
                Ok(Step::Continue)
            }
            Some(_) => {
                self.out_of_range(contact.consent_options.len())?;
                Ok(Step::Continue)
            }
        }
    }

    async fn details_step(&mut self, wizard: &mut Wizard) -> Result<Step, AppError> {
        let contact = wizard.catalog().contact.clone();
        writeln!(self.output)?;
        writeln!(self.output, "{} (Enter skips a field)", contact.preferred_prompt)?;
        for (index, option) in contact.preferred_options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", index + 1, option.label())?;
        }
        write!(self.output, "> ")?;
        self.output.flush()?;
        match self.read_command().await? {
            None | Some(Command::Quit) => return Ok(Step::Pause),
            Some(Command::Back) => {
                wizard.choose_contact(false)?;
                return Ok(Step::Continue);
            }
            Some(Command::Next) => {}
            Some(Command::Entry(entry)) => {
                let preferred = entry
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| index.checked_sub(1))
                    .and_then(|index| contact.preferred_options.get(index).copied())
                    .or_else(|| PreferredContact::from_label(&entry));
                match preferred {
                    Some(preferred) => wizard.set_preferred_contact(Some(preferred))?,
                    None => self.out_of_range(contact.preferred_options.len())?,
                }
            }
        }

        for (label, is_email) in [(contact.email_label, true), (contact.phone_label, false)] {
            write!(self.output, "{label}: ")?;
            self.output.flush()?;
            match self.read_command().await? {
                None | Some(Command::Quit) => return Ok(Step::Pause),
                Some(Command::Back) => {
                    wizard.choose_contact(false)?;
                    return Ok(Step::Continue);
                }
                Some(Command::Next) => {}
                Some(Command::Entry(value)) if is_email => wizard.set_email(value)?,
                Some(Command::Entry(value)) => wizard.set_phone(value)?,
            }
        }

        if !wizard.can_submit() {
            writeln!(self.output, "No contact details given; submitting without them.")?;
        }
        self.submit(wizard).await?;
        Ok(Step::Continue)
    }

    async fn submit(&mut self, wizard: &mut Wizard) -> Result<(), AppError> {
        writeln!(self.output, "Submitting...")?;
        self.output.flush()?;
        wizard.submit().await?;
        Ok(())
    }

    fn print_question(&mut self, question: &Question, answer: Option<&Answer>) -> Result<(), AppError> {
        let optional = if question.optional { " (optional)" } else { "" };
        writeln!(self.output, "{}{}", question.prompt, optional)?;

        match question.kind {
            QuestionKind::Single | QuestionKind::Multiselect => {
                let selected: Vec<&str> = match answer {
                    Some(Answer::Single(value)) => vec![value.as_str()],
                    Some(Answer::Multiselect(values)) => values.iter().map(String::as_str).collect(),
                    _ => Vec::new(),
                };
                for (index, option) in question.options.iter().enumerate() {
                    let mark = if selected.contains(option) { "*" } else { " " };
                    writeln!(self.output, " {mark}{}) {}", index + 1, option)?;
                }
                if question.kind == QuestionKind::Multiselect {
                    writeln!(
                        self.output,
                        "Toggle up to {} by number, then press Enter.",
                        question.selection_cap()
                    )?;
                }
            }
            QuestionKind::Matrix => {
                let columns = question
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| format!("{}={}", index + 1, column))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(self.output, "Columns: {columns}")?;
                for (index, row) in question.rows.iter().enumerate() {
                    let chosen = match answer {
                        Some(Answer::Matrix(cells)) => cells.get(*row).map(String::as_str),
                        _ => None,
                    };
                    writeln!(self.output, "  {}) {} [{}]", index + 1, row, chosen.unwrap_or("-"))?;
                }
                writeln!(self.output, "Answer with row:column pairs, then press Enter.")?;
            }
            QuestionKind::Text => {
                if let Some(Answer::Text(value)) = answer {
                    writeln!(self.output, "Current answer: {value}")?;
                }
                if let Some(placeholder) = question.placeholder.filter(|text| !text.is_empty()) {
                    writeln!(self.output, "({placeholder})")?;
                }
            }
        }
        Ok(())
    }

    fn print_completion(
        &mut self,
        wizard: &Wizard,
        acknowledgement: &Acknowledgement,
    ) -> Result<(), AppError> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", wizard.catalog().completion.title)?;
        writeln!(self.output, "{}", wizard.completion_message())?;
        if acknowledgement.is_local() {
            writeln!(
                self.output,
                "The reading room could not be reached; this submission was recorded on this device only."
            )?;
        } else {
            writeln!(self.output, "Reference: {}", acknowledgement.response_id)?;
        }
        Ok(())
    }

    fn out_of_range(&mut self, count: usize) -> Result<(), AppError> {
        writeln!(self.output, "Choose a number between 1 and {count}.")?;
        Ok(())
    }

    async fn read_command(&mut self) -> Result<Option<Command>, AppError> {
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(parse_command(&line)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Pause,
}

fn pick<'a>(options: &[&'a str], raw: &str) -> Option<&'a str> {
    let index = raw.trim().parse::<usize>().ok()?.checked_sub(1)?;
    options.get(index).copied()
}

fn tokens(entry: &str) -> impl Iterator<Item = &str> {
    entry
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
}
