use clap::{Arg, ArgAction, Command};
use color_eyre::eyre::{eyre, Result};
use dfaviz::fa::FA;
use dfaviz::{build_followpos_table, build_syntax_tree, construct_dfa, save_dfa, visualize};
use std::path::PathBuf;

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Command::new("dfaviz")
        .version("0.1")
        .author("Nagendra Kumar Jamadagni")
        .about("Builds a DFA directly from a regular expression using firstpos, lastpos and followpos")
        .arg(
            Arg::new("regex")
                .short('r')
                .long("regex")
                .value_name("REGEX")
                .value_parser(clap::value_parser!(String))
                .required(true)
                .help("The regular expression. Supports symbols, |, *, + and parentheses"),
        )
        .arg(
            Arg::new("show-tree")
                .short('t')
                .long("show-tree")
                .action(ArgAction::SetTrue)
                .help("Print the syntax tree with nullable, firstpos and lastpos of every node"),
        )
        .arg(
            Arg::new("followpos")
                .short('f')
                .long("followpos")
                .action(ArgAction::SetTrue)
                .help("Print the followpos table"),
        )
        .arg(
            Arg::new("match")
                .short('m')
                .long("match")
                .value_name("INPUT")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(String))
                .help("Check whether the DFA accepts INPUT. May be given several times"),
        )
        .arg(
            Arg::new("save-dfa")
                .short('d')
                .long("save-dfa")
                .action(ArgAction::SetTrue)
                .help("Save the constructed DFA as a jpg. Requires Graphviz"),
        )
        .arg(
            Arg::new("save-tree")
                .short('s')
                .long("save-tree")
                .action(ArgAction::SetTrue)
                .help("Save the annotated syntax tree as a jpg. Requires Graphviz"),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .value_name("OUTPUT FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Save the constructed DFA as json"),
        )
        .arg(
            Arg::new("visualize")
                .short('v')
                .long("visualize")
                .action(ArgAction::SetTrue)
                .help("Visualize the DFA inside an interactive window that allows for zooming, panning and clicking of elements"),
        )
        .get_matches();

    let regex = args
        .get_one::<String>("regex")
        .ok_or_else(|| eyre!("Error: A regular expression must be provided"))?;

    let syntax_tree = build_syntax_tree(regex)?;

    if args.get_flag("show-tree") {
        println!("Normalized: {}", syntax_tree.get_normalized());
        print!("{}", syntax_tree);
        println!();
    }

    if args.get_flag("save-tree") {
        syntax_tree.show_tree("syntax_tree")?;
    }

    let followpos = build_followpos_table(&syntax_tree);

    if args.get_flag("followpos") {
        print!("{}", followpos.display(&syntax_tree));
        println!();
    }

    let dfa = construct_dfa(&syntax_tree, &followpos);

    dfa.print_transition_table();

    if let Some(inputs) = args.get_many::<String>("match") {
        println!();
        for input in inputs {
            let verdict = if dfa.accepts(input) {
                "accepted"
            } else {
                "rejected"
            };
            println!("{:?}: {}", input, verdict);
        }
    }

    if args.get_flag("save-dfa") {
        dfa.show_fa("constructed_dfa")?;
    }

    if let Some(json_path) = args.get_one::<PathBuf>("json") {
        save_dfa(&dfa, &json_path.to_string_lossy())?;
        println!("DFA saved as {}", json_path.display());
    }

    if args.get_flag("visualize") {
        visualize(&dfa)?;
    }

    Ok(())
}
