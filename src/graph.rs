use crate::numeric::Tolerance;
use crate::solution::{transpose_arcs, Edge, Flow, UnsignedInt};
use crate::solver::index;
use anyhow;
use anyhow::{bail, ensure, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Transportation problem stored in a graph file.
///
/// Demand nodes are the sinks of the file and come first, supply nodes are numbered after
/// them. Files with more sources than sinks are read with the roles swapped, so the demand
/// side is always the larger one.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem<I: UnsignedInt> {
    pub seed: u64,
    pub demand: Vec<f64>,
    pub supply: Vec<f64>,
    /// arcs of every demand node
    pub arcs: Vec<Vec<Edge<I>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Graph,
    Sizes,
    DemandHeader,
    Demand,
    Arcs,
    Supply,
}

fn parse<T: FromStr>(token: &str, what: &str) -> Result<T, anyhow::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    token
        .parse::<T>()
        .with_context(|| format!("invalid {} '{}'", what, token))
}

fn format_value(value: f64, tolerance: Tolerance) -> String {
    if tolerance.is_integral(value) {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.8}", value)
    }
}

impl<I: UnsignedInt> Problem<I> {
    pub fn num_arcs(&self) -> usize {
        self.arcs.iter().map(|row| row.len()).sum()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("can't open graph {}", path.display()))?;
        Self::read(BufReader::new(file))
            .with_context(|| format!("can't read graph {}", path.display()))
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Self, anyhow::Error> {
        let mut lines = reader.lines().enumerate();
        let first = match lines.next() {
            Some((_, line)) => line?,
            None => bail!("graph is empty"),
        };
        ensure!(first.trim() == "BEGIN", "graph must start with BEGIN");

        let mut section = Section::Graph;
        let mut seed = 0;
        let mut num_sinks = 0;
        let mut num_sources = 0;
        let mut sinks: Vec<f64> = Vec::new();
        let mut sources: Vec<f64> = Vec::new();
        let mut sink_arcs: Vec<Vec<Edge<I>>> = Vec::new();
        let mut finished = false;

        for (n, line) in lines {
            let line = line?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let line_no = n + 1;
            match (section, tokens.as_slice()) {
                (
                    Section::Graph,
                    ["GRAPH", s, "WITH", nsinks, "SINKS", "AND", nsources, "SOURCES"],
                ) => {
                    seed = parse(s, "seed")?;
                    num_sinks = parse(nsinks, "number of sinks")?;
                    num_sources = parse(nsources, "number of sources")?;
                    index::<I>(num_sinks + num_sources)?;
                    sink_arcs.resize(num_sinks, Vec::new());
                    section = Section::Sizes;
                }
                (Section::Sizes, [_, "ARCS", "AND", _, "TOTAL", "WEIGHT"]) => {
                    section = Section::DemandHeader;
                }
                (Section::DemandHeader, ["DEMAND"]) => section = Section::Demand,
                (Section::Demand, ["ARCS"]) => section = Section::Arcs,
                (Section::Demand, [id, weight]) | (Section::Supply, [id, weight]) => {
                    let id: usize = parse(id, "node id")?;
                    let expected = sinks.len() + sources.len() + 1;
                    ensure!(
                        id == expected,
                        "line {}: expected node {}, got {}",
                        line_no,
                        expected,
                        id
                    );
                    let weight: f64 = parse(weight, "weight")?;
                    if section == Section::Demand {
                        sinks.push(weight);
                    } else {
                        sources.push(weight);
                    }
                }
                (Section::Arcs, ["SUPPLY"]) => section = Section::Supply,
                (Section::Arcs, [tail, head, cost, _flow]) => {
                    let tail: usize = parse(tail, "arc tail")?;
                    let head: usize = parse(head, "arc head")?;
                    ensure!(
                        (1..=num_sinks).contains(&tail)
                            && (num_sinks + 1..=num_sinks + num_sources).contains(&head),
                        "line {}: arc {} -> {} is out of range",
                        line_no,
                        tail,
                        head
                    );
                    let cost: f64 = parse(cost, "arc cost")?;
                    sink_arcs[tail - 1].push(Edge::new(
                        cost,
                        index(tail - 1)?,
                        index(head - num_sinks - 1)?,
                    ));
                }
                (Section::Supply, ["END"]) => {
                    finished = true;
                    break;
                }
                _ => bail!("line {}: unexpected '{}'", line_no, line.trim()),
            }
        }
        ensure!(finished, "graph must end with END");
        ensure!(
            sinks.len() == num_sinks && sources.len() == num_sources,
            "expected {} sinks and {} sources, got {} and {}",
            num_sinks,
            num_sources,
            sinks.len(),
            sources.len()
        );

        let problem = if num_sources > num_sinks {
            Problem {
                seed,
                demand: sources,
                arcs: transpose_arcs(&sink_arcs, num_sources),
                supply: sinks,
            }
        } else {
            Problem {
                seed,
                demand: sinks,
                supply: sources,
                arcs: sink_arcs,
            }
        };
        debug!(
            "graph {}: {} demand nodes, {} supply nodes, {} arcs",
            problem.seed,
            problem.demand.len(),
            problem.supply.len(),
            problem.num_arcs()
        );
        Ok(problem)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, plan: &[Flow<I>]) -> Result<(), anyhow::Error> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("can't create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer, plan)?;
        writer
            .flush()
            .with_context(|| format!("can't write {}", path.display()))
    }

    /// Writes the graph with the flow of every arc taken from `plan`.
    pub fn write<W: Write>(&self, mut writer: W, plan: &[Flow<I>]) -> Result<(), anyhow::Error> {
        let tolerance = Tolerance::default();
        let mut flows: Vec<Vec<f64>> = self.arcs.iter().map(|row| vec![0.; row.len()]).collect();
        for flow in plan.iter() {
            let source = match flow.source {
                Some(source) => source,
                None => continue,
            };
            let row: usize = source.as_();
            let position = self
                .arcs
                .get(row)
                .and_then(|arcs| arcs.iter().position(|edge| edge.sink == flow.sink));
            match position {
                Some(position) => flows[row][position] = flow.amount,
                None => warn!("no arc {} -> {} for flow {}", source, flow.sink, flow.amount),
            }
        }

        let num_sinks = self.demand.len();
        let total: f64 = self.demand.iter().sum();
        writeln!(writer, "BEGIN")?;
        writeln!(
            writer,
            "GRAPH {:010} WITH {} SINKS AND {} SOURCES",
            self.seed,
            num_sinks,
            self.supply.len()
        )?;
        writeln!(
            writer,
            " {} ARCS AND {} TOTAL WEIGHT",
            self.num_arcs(),
            format_value(total, tolerance)
        )?;
        writeln!(writer, "DEMAND")?;
        for (id, weight) in self.demand.iter().enumerate() {
            writeln!(writer, " {} {}", id + 1, format_value(*weight, tolerance))?;
        }
        writeln!(writer, "ARCS")?;
        for (row, flow_row) in self.arcs.iter().zip(flows.iter()) {
            for (edge, flow) in row.iter().zip(flow_row.iter()) {
                let tail: usize = edge.source.as_();
                let head: usize = edge.sink.as_();
                writeln!(
                    writer,
                    " {} {} {} {}",
                    tail + 1,
                    head + num_sinks + 1,
                    format_value(edge.cost, tolerance),
                    format_value(*flow, tolerance)
                )?;
            }
        }
        writeln!(writer, "SUPPLY")?;
        for (id, weight) in self.supply.iter().enumerate() {
            writeln!(
                writer,
                " {} {}",
                id + num_sinks + 1,
                format_value(*weight, tolerance)
            )?;
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}
