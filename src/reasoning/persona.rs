use std::fmt;

/// Who produced a node's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    /// The root. Its text is the problem statement itself.
    Question,
    Silly,
    Funny,
    Smart,
}

impl Persona {
    /// Personas that contribute a step, in the order children are produced.
    pub const CONTRIBUTORS: [Persona; 3] = [Persona::Silly, Persona::Funny, Persona::Smart];

    /// Prefix that introduces this persona's line in the transcript.
    pub fn tag(self) -> &'static str {
        match self {
            Persona::Question => "",
            Persona::Silly => "Silly Man: ",
            Persona::Funny => "Funny Man: ",
            Persona::Smart => "Smart Man: ",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Persona::Question => "Question",
            Persona::Silly => "Silly",
            Persona::Funny => "Funny",
            Persona::Smart => "Smart",
        };
        f.write_str(name)
    }
}
