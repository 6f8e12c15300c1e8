//! Interactive enrichment loop.
//!
//! Walks an analyst through documenting a case: the initial detection, then
//! one enrichment level per network element (pick an insertion point, pick a
//! type, name it, record source and destination entries), then the report.
//! Generic over its input and output so a scripted session can drive it.

use std::io::{self, BufRead, Write};

use tracer_core::{
    Case, CaseId, CoreError, ElementType, InfoSide, MovementType, NetworkElement,
};
use tracer_store::CaseRepository;

use crate::error::{EngineError, Result};
use crate::report::RULE;
use crate::CaseEngine;

/// What the analyst chose at the insertion menu.
enum MenuChoice {
    Insert(usize),
    Pivot,
    Done,
}

pub struct Prompter<'e, R, I, W> {
    engine: &'e CaseEngine<R>,
    input: I,
    output: W,
}

impl<'e, R, I, W> Prompter<'e, R, I, W>
where
    R: CaseRepository,
    I: BufRead,
    W: Write,
{
    pub fn new(engine: &'e CaseEngine<R>, input: I, output: W) -> Self {
        Self {
            engine,
            input,
            output,
        }
    }

    /// Run a full session and return the id of the case it worked on.
    ///
    /// Continues `existing` when given, otherwise starts with the initial
    /// detection. Ends by printing the report.
    pub async fn run(&mut self, existing: Option<CaseId>) -> Result<CaseId> {
        writeln!(self.output, "{RULE}")?;
        writeln!(self.output, "TRACER Framework - Network Path Analysis Tool")?;
        writeln!(self.output, "{RULE}")?;

        let case_id = match existing {
            Some(case_id) => {
                let case = self.engine.retrieve(&case_id).await?;
                writeln!(self.output, "\nLoaded existing case: {}", case.case_id)?;
                writeln!(self.output, "Threat: {}", case.threat_type)?;
                writeln!(self.output, "Network Elements: {}", case.element_count())?;
                case.case_id
            }
            None => self.initial_detection().await?,
        };

        self.enrich(&case_id).await?;

        let generated = self.engine.generate_report(&case_id).await?;
        writeln!(self.output)?;
        write!(self.output, "{}", generated.text)?;
        self.output.flush()?;

        Ok(case_id)
    }

    async fn initial_detection(&mut self) -> Result<CaseId> {
        writeln!(self.output, "\n--- INITIAL DETECTION ---")?;
        let threat_type = self.ask("Threat type: ")?;

        loop {
            let source = self.ask("Source IP: ")?;
            let destination = self.ask("Destination IP: ")?;

            match self
                .engine
                .new_case(&threat_type, &source, &destination)
                .await
            {
                Ok(case) => {
                    writeln!(self.output, "\nDetected: {}", case.threat_type)?;
                    writeln!(self.output, "  Source: {}", case.path.source())?;
                    writeln!(self.output, "  Destination: {}", case.path.destination())?;
                    writeln!(self.output, "  Case ID: {}", case.case_id)?;
                    return Ok(case.case_id);
                }
                Err(EngineError::Core(e @ CoreError::InvalidEndpoint { .. })) => {
                    writeln!(self.output, "{e}")?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn enrich(&mut self, case_id: &CaseId) -> Result<()> {
        let mut level = 1;

        loop {
            let case = self.engine.retrieve(case_id).await?;
            self.show_path(&case)?;

            writeln!(self.output, "\n--- ENRICHMENT LEVEL {level} ---")?;
            let max = case.path.len() + 1;

            let (position, movement) = match self.menu(max)? {
                MenuChoice::Done => return Ok(()),
                MenuChoice::Insert(position) => (position, None),
                MenuChoice::Pivot => {
                    writeln!(
                        self.output,
                        "A pivot point is where the attacker moved laterally to another system or network."
                    )?;
                    (self.ask_position(max)?, Some(MovementType::Lateral))
                }
            };

            let element = self.collect_element(movement)?;
            match self.engine.add_element(case_id, position, element).await {
                Ok(_) => {
                    writeln!(self.output, "Element added at position {position}")?;
                    level += 1;
                }
                Err(EngineError::Core(e @ CoreError::PositionOutOfRange { .. })) => {
                    writeln!(self.output, "{e}")?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn show_path(&mut self, case: &Case) -> io::Result<()> {
        writeln!(self.output, "\n{RULE}")?;
        writeln!(self.output, "CURRENT NETWORK PATH")?;
        writeln!(self.output, "{RULE}")?;
        writeln!(self.output, "SOURCE: {}", case.path.source())?;

        for (position, element) in case.path.sequence() {
            writeln!(self.output, "  [{position}] <-- Insert Point")?;
            writeln!(self.output, "    ↓")?;
            writeln!(
                self.output,
                "  {} ({}) - {}",
                element.name,
                element.element_type.label(),
                element.movement_type.label()
            )?;
            for (key, value) in element.source_info.iter() {
                writeln!(self.output, "      • {key}: {value}")?;
            }
            for (key, value) in element.destination_info.iter() {
                writeln!(self.output, "      • {key}: {value}")?;
            }
        }

        writeln!(self.output, "  [{}] <-- Insert Point", case.path.len() + 1)?;
        writeln!(self.output, "    ↓")?;
        writeln!(self.output, "DESTINATION: {}", case.path.destination())?;
        writeln!(self.output, "{RULE}")
    }

    fn menu(&mut self, max: usize) -> Result<MenuChoice> {
        writeln!(self.output, "\nOptions:")?;
        writeln!(self.output, "  - Enter a number (1-{max}) to add an element at that position")?;
        writeln!(self.output, "  - Type 'pivot' to add a lateral movement hop")?;
        writeln!(self.output, "  - Type 'done' to finish enrichment")?;

        loop {
            let choice = self.ask("\nChoice: ")?.to_lowercase();
            match choice.as_str() {
                "done" => return Ok(MenuChoice::Done),
                "pivot" => return Ok(MenuChoice::Pivot),
                other => match other.parse::<usize>() {
                    Ok(position) if (1..=max).contains(&position) => {
                        return Ok(MenuChoice::Insert(position))
                    }
                    Ok(_) => writeln!(self.output, "Invalid position. Please choose 1-{max}")?,
                    Err(_) => writeln!(
                        self.output,
                        "Invalid input. Please enter a number, 'pivot', or 'done'"
                    )?,
                },
            }
        }
    }

    fn ask_position(&mut self, max: usize) -> Result<usize> {
        loop {
            let raw = self.ask(&format!("Where to insert this hop? (1-{max}): "))?;
            match raw.parse::<usize>() {
                Ok(position) if (1..=max).contains(&position) => return Ok(position),
                _ => writeln!(self.output, "Invalid position. Please choose 1-{max}")?,
            }
        }
    }

    /// Collect a complete element. `movement` presets the movement type.
    fn collect_element(&mut self, movement: Option<MovementType>) -> Result<NetworkElement> {
        writeln!(self.output, "\n--- ADD NETWORK ELEMENT ---")?;
        let element_type = self.ask_element_type()?;

        let name = loop {
            let name = self.ask(&format!("{} name/identifier: ", element_type.label()))?;
            if !name.is_empty() {
                break name;
            }
            writeln!(self.output, "A name is required.")?;
        };

        let movement_type = match movement {
            Some(movement) => movement,
            None => self.ask_movement()?,
        };

        let mut element = NetworkElement::new(element_type, name, movement_type)?;

        writeln!(self.output, "\n--- {} INFORMATION ---", element.name.to_uppercase())?;
        self.collect_entries(&mut element, InfoSide::Source)?;

        let more = self.ask("Add destination information? (y/n): ")?;
        if more.eq_ignore_ascii_case("y") || more.eq_ignore_ascii_case("yes") {
            self.collect_entries(&mut element, InfoSide::Destination)?;
        }

        Ok(element)
    }

    fn ask_element_type(&mut self) -> Result<ElementType> {
        let keywords = ElementType::KEYWORDS.join(", ");
        loop {
            let raw = self.ask(&format!("Element type ({keywords}): "))?;
            if raw.eq_ignore_ascii_case("other") {
                let label = self.ask("Describe the element type: ")?;
                match ElementType::other(label) {
                    Ok(t) => return Ok(t),
                    Err(e) => writeln!(self.output, "{e}")?,
                }
                continue;
            }
            match raw.parse::<ElementType>() {
                Ok(t) => return Ok(t),
                Err(e) => writeln!(self.output, "{e}")?,
            }
        }
    }

    fn ask_movement(&mut self) -> Result<MovementType> {
        loop {
            let raw = self.ask("Movement type (direct/lateral) [direct]: ")?;
            if raw.is_empty() {
                return Ok(MovementType::Direct);
            }
            match raw.parse::<MovementType>() {
                Ok(m) => return Ok(m),
                Err(e) => writeln!(self.output, "{e}")?,
            }
        }
    }

    fn collect_entries(&mut self, element: &mut NetworkElement, side: InfoSide) -> Result<()> {
        writeln!(
            self.output,
            "\nAdd {side} information for {} (or 'next' to continue):",
            element.name
        )?;
        writeln!(
            self.output,
            "Examples: MAC address, interface name, VLAN, ARP entry, CAM entry"
        )?;

        loop {
            let key = self.ask("Information type: ")?;
            if key.is_empty() || key.eq_ignore_ascii_case("next") {
                return Ok(());
            }
            let value = self.ask(&format!("{key}: "))?;
            if let Err(e) = element.add_entry(side, key, value) {
                writeln!(self.output, "{e}")?;
            }
        }
    }

    /// Print `prompt` and read one trimmed line. End of input is an error.
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before the session finished",
            ));
        }
        Ok(line.trim().to_string())
    }
}
