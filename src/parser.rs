use nom::IResult;

use crate::types::*;

fn blanks(input: &str) -> IResult<&str, &str> {
    nom::bytes::complete::take_while(|c: char| c == ' ')(input)
}

fn parse_seconds(input: &str) -> IResult<&str, f64> {
    nom::sequence::delimited(blanks, nom::number::complete::double, blanks)(input)
}

fn parse_timing_pair(input: &str) -> IResult<&str, TimingLine> {
    let (input, (sys_time, user_time)) = nom::sequence::separated_pair(
        parse_seconds,
        nom::character::complete::char('\t'),
        parse_seconds,
    )(input)?;

    Ok((
        input,
        TimingLine {
            sys_time,
            user_time,
        },
    ))
}

/// `<sys_time>\t<user_time>`, optionally followed by more tab-separated
/// fields which are ignored.
pub fn parse_timing_line(input: &str) -> IResult<&str, TimingLine> {
    let (input, timing) = parse_timing_pair(input)?;
    let (input, _) = nom::branch::alt((
        nom::combinator::eof,
        nom::sequence::preceded(
            nom::character::complete::char('\t'),
            nom::combinator::rest,
        ),
    ))(input)?;

    Ok((input, timing))
}

/// Exactly `<sys_time>\t<user_time>`; any further field rejects the line.
pub fn parse_exact_timing_line(input: &str) -> IResult<&str, TimingLine> {
    nom::combinator::all_consuming(parse_timing_pair)(input)
}

/// `-o <path> `; the path must be followed by a single space.
pub fn parse_output_flag(input: &str) -> IResult<&str, &str> {
    nom::sequence::terminated(
        nom::sequence::preceded(
            nom::bytes::complete::tag("-o "),
            nom::bytes::complete::take_till1(|c: char| c.is_whitespace()),
        ),
        nom::character::complete::char(' '),
    )(input)
}

pub fn output_target(line: &str) -> Option<&str> {
    line.match_indices("-o ").find_map(|(at, _)| {
        parse_output_flag(&line[at..])
            .ok()
            .map(|(_, target)| target)
    })
}

pub fn marker_work_type(line: &str) -> Option<WorkType> {
    if line.contains(BUILD_MARKER) {
        Some(WorkType::Build)
    } else if line.contains(LINK_MARKER) {
        Some(WorkType::Linking)
    } else {
        None
    }
}

pub fn marker_target(line: &str) -> &str {
    line.split_whitespace().last().unwrap_or_default()
}

enum Detection<'a> {
    Nothing,
    Skip(ScanEvent<'a>),
    Marker(Marker<'a>, usize),
}

/// Walks a build log one unit at a time.
///
/// Every marker yields exactly one event. Only [`ScanEvent::Unit`] carries a
/// record; the other events describe units that were dropped and why.
/// [`ScanEvent::Truncated`] is always the last event.
///
/// Cursor rules:
/// - after a unit, scanning resumes on the line following its timing line;
/// - after [`ScanEvent::Malformed`], scanning resumes *on* the rejected timing
///   line, so a marker sitting where the timing line was expected still opens
///   its own unit. No line is ever visited twice as a timing line, so the scan
///   always makes progress;
/// - after [`ScanEvent::Placeholder`] or [`ScanEvent::Untargeted`], scanning
///   resumes on the next line.
///
/// Marker logs tolerate extra tab-separated fields after the two timings;
/// invocation logs require exactly two.
#[derive(Debug, Clone)]
pub struct LogScanner<'a> {
    lines: Vec<&'a str>,
    variant: Variant,
    cursor: usize,
    state: ScanState<'a>,
}

impl<'a> LogScanner<'a> {
    pub fn new(text: &'a str, variant: &Variant) -> Self {
        Self::from_lines(text.lines().collect(), variant)
    }

    pub fn from_lines(lines: Vec<&'a str>, variant: &Variant) -> Self {
        LogScanner {
            lines,
            variant: variant.clone(),
            cursor: 0,
            state: ScanState::SeekingMarker,
        }
    }

    fn parse_timing(&self, line: &str) -> Option<TimingLine> {
        let parsed = match self.variant {
            Variant::Marker { .. } => parse_timing_line(line),
            Variant::Invocation { .. } => parse_exact_timing_line(line),
        };

        parsed.ok().map(|(_, timing)| timing)
    }

    fn detect(&self, index: usize, line: &'a str) -> Detection<'a> {
        match &self.variant {
            Variant::Marker { invocation } => {
                let Some(work_type) = marker_work_type(line) else {
                    return Detection::Nothing;
                };
                let marker = Marker {
                    line: index,
                    work_type,
                    target: marker_target(line),
                };

                if let (Some(tool), Some(next)) = (invocation, self.lines.get(index + 1)) {
                    if !next.contains(tool.as_str()) {
                        return Detection::Skip(ScanEvent::Placeholder { marker });
                    }
                }

                Detection::Marker(marker, index + 2)
            }
            Variant::Invocation { tool, link_flag } => {
                if !line.contains(tool.as_str()) {
                    return Detection::Nothing;
                }

                match output_target(line) {
                    Some(target) => {
                        let work_type = if line.contains(link_flag.as_str()) {
                            WorkType::Linking
                        } else {
                            WorkType::Build
                        };

                        Detection::Marker(
                            Marker {
                                line: index,
                                work_type,
                                target,
                            },
                            index + 1,
                        )
                    }
                    None => Detection::Skip(ScanEvent::Untargeted { line: index }),
                }
            }
        }
    }
}

impl<'a> Iterator for LogScanner<'a> {
    type Item = ScanEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                ScanState::Done => return None,
                ScanState::SeekingMarker => {
                    let Some(&line) = self.lines.get(self.cursor) else {
                        self.state = ScanState::Done;
                        return None;
                    };

                    match self.detect(self.cursor, line) {
                        Detection::Nothing => self.cursor += 1,
                        Detection::Skip(event) => {
                            self.cursor += 1;
                            return Some(event);
                        }
                        Detection::Marker(marker, timing_at) => {
                            self.state = ScanState::AwaitingTiming { marker, timing_at };
                        }
                    }
                }
                ScanState::AwaitingTiming { marker, timing_at } => {
                    let Some(&line) = self.lines.get(timing_at) else {
                        self.state = ScanState::Done;
                        return Some(ScanEvent::Truncated { marker });
                    };

                    self.state = ScanState::SeekingMarker;

                    return match self.parse_timing(line.trim_end()) {
                        Some(timing) => {
                            self.cursor = timing_at + 1;
                            Some(ScanEvent::Unit(TimingRecord::new(marker, timing)))
                        }
                        None => {
                            self.cursor = timing_at;
                            Some(ScanEvent::Malformed {
                                marker,
                                line: timing_at,
                            })
                        }
                    };
                }
            }
        }
    }
}

pub fn scan_log<'a>(text: &'a str, variant: &Variant) -> Vec<TimingRecord<'a>> {
    LogScanner::new(text, variant)
        .filter_map(ScanEvent::record)
        .collect()
}
