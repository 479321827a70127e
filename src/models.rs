//! Input graph constructors for the bundled DNN models
//!
//! These builders assemble the baseline graphs the optimizer starts from.
//! Convolutions are emitted with separate batch-normalization and activation
//! nodes where the architecture has them; folding those chains is the
//! optimizer's job, not the builder's.

use rewire_core::{ActiMode, Tensor, TensorDims};
use rewire_graph::{Graph, GraphError, Model};

const BATCH_SIZE: usize = 1;

/// SqueezeNet with complex bypass connections
pub fn squeezenet(model: &mut Model) -> Result<Graph, GraphError> {
    let mut graph = Graph::new();
    let input = graph.input(model, TensorDims::d4(BATCH_SIZE, 3, 222, 222))?;
    let mut t = graph.conv2d(model, &input, 96, (7, 7), (2, 2), (3, 3), ActiMode::Relu)?;
    t = graph.pool2d_max(model, &t, (3, 3), (2, 2), (0, 0))?;
    t = fire_complex(&mut graph, model, &t, 16, 64)?;
    t = fire_complex(&mut graph, model, &t, 16, 64)?;
    t = fire_complex(&mut graph, model, &t, 32, 128)?;
    t = graph.pool2d_max(model, &t, (3, 3), (2, 2), (0, 0))?;
    t = fire_complex(&mut graph, model, &t, 32, 128)?;
    t = fire_complex(&mut graph, model, &t, 48, 192)?;
    t = fire_complex(&mut graph, model, &t, 48, 192)?;
    t = fire_complex(&mut graph, model, &t, 64, 256)?;
    t = graph.pool2d_max(model, &t, (3, 3), (2, 2), (0, 0))?;
    t = fire_complex(&mut graph, model, &t, 64, 256)?;
    t = graph.conv2d(model, &t, 1000, (1, 1), (1, 1), (0, 0), ActiMode::Relu)?;
    let side = t.dims.get(2);
    graph.pool2d_avg(model, &t, (side, side), (1, 1), (0, 0))?;
    Ok(graph)
}

/// Fire module with a bypass path: squeeze, two parallel expands, concat,
/// and a residual add (with a 1x1 projection when the channel counts differ)
fn fire_complex(
    graph: &mut Graph,
    model: &mut Model,
    input: &Tensor,
    squeeze: usize,
    expand: usize,
) -> Result<Tensor, GraphError> {
    let squeezed = graph.conv2d(model, input, squeeze, (1, 1), (1, 1), (0, 0), ActiMode::Relu)?;
    let left = graph.conv2d(model, &squeezed, expand, (3, 3), (1, 1), (1, 1), ActiMode::Relu)?;
    let right = graph.conv2d(model, &squeezed, expand, (1, 1), (1, 1), (0, 0), ActiMode::Relu)?;
    let joined = graph.concat(model, &[&left, &right])?;

    let bypass = if input.dims.channels() == 2 * expand {
        input.clone()
    } else {
        graph.conv2d(model, input, 2 * expand, (1, 1), (1, 1), (0, 0), ActiMode::Relu)?
    };
    graph.add(model, &joined, &bypass)
}

/// ResNet-18: basic blocks, [2, 2, 2, 2]
pub fn resnet18(model: &mut Model) -> Result<Graph, GraphError> {
    resnet_basic(model, &[2, 2, 2, 2])
}

/// ResNet-34: basic blocks, [3, 4, 6, 3]
pub fn resnet34(model: &mut Model) -> Result<Graph, GraphError> {
    resnet_basic(model, &[3, 4, 6, 3])
}

/// ResNet-50: bottleneck blocks, [3, 4, 6, 3]
pub fn resnet50(model: &mut Model) -> Result<Graph, GraphError> {
    let (mut graph, mut t) = resnet_stem(model)?;
    let mut stride = 1;
    for (channels, blocks) in [(64, 3), (128, 4), (256, 6), (512, 3)] {
        for block in 0..blocks {
            let s = if block == 0 { stride } else { 1 };
            t = bottleneck_block(&mut graph, model, &t, channels, s)?;
        }
        stride = 2;
    }
    let side = t.dims.get(2);
    graph.pool2d_avg(model, &t, (side, side), (1, 1), (0, 0))?;
    Ok(graph)
}

fn resnet_basic(model: &mut Model, layers: &[usize]) -> Result<Graph, GraphError> {
    let (mut graph, mut t) = resnet_stem(model)?;
    let mut stride = 1;
    for (channels, &blocks) in [64, 128, 256, 512].into_iter().zip(layers) {
        for block in 0..blocks {
            let s = if block == 0 { stride } else { 1 };
            t = basic_block(&mut graph, model, &t, channels, s)?;
        }
        stride = 2;
    }
    let side = t.dims.get(2);
    graph.pool2d_avg(model, &t, (side, side), (1, 1), (0, 0))?;
    Ok(graph)
}

/// Shared 7x7 stem: conv, batchnorm, relu, max-pool
fn resnet_stem(model: &mut Model) -> Result<(Graph, Tensor), GraphError> {
    let mut graph = Graph::new();
    let input = graph.input(model, TensorDims::d4(BATCH_SIZE, 3, 224, 224))?;
    let conv = graph.conv2d(model, &input, 64, (7, 7), (2, 2), (3, 3), ActiMode::None)?;
    let bn = graph.batchnorm(model, &conv)?;
    let relu = graph.relu(model, &bn)?;
    let pooled = graph.pool2d_max(model, &relu, (3, 3), (2, 2), (1, 1))?;
    Ok((graph, pooled))
}

fn basic_block(
    graph: &mut Graph,
    model: &mut Model,
    input: &Tensor,
    channels: usize,
    stride: usize,
) -> Result<Tensor, GraphError> {
    let conv = graph.conv2d(
        model,
        input,
        channels,
        (3, 3),
        (stride, stride),
        (1, 1),
        ActiMode::None,
    )?;
    let bn = graph.batchnorm(model, &conv)?;
    let mid = graph.relu(model, &bn)?;
    let conv = graph.conv2d(model, &mid, channels, (3, 3), (1, 1), (1, 1), ActiMode::None)?;
    let main = graph.batchnorm(model, &conv)?;

    let shortcut = projection(graph, model, input, channels, stride)?;
    let sum = graph.add(model, &main, &shortcut)?;
    graph.relu(model, &sum)
}

fn bottleneck_block(
    graph: &mut Graph,
    model: &mut Model,
    input: &Tensor,
    channels: usize,
    stride: usize,
) -> Result<Tensor, GraphError> {
    let out_channels = channels * 4;
    let conv = graph.conv2d(model, input, channels, (1, 1), (1, 1), (0, 0), ActiMode::None)?;
    let bn = graph.batchnorm(model, &conv)?;
    let t = graph.relu(model, &bn)?;
    let conv = graph.conv2d(
        model,
        &t,
        channels,
        (3, 3),
        (stride, stride),
        (1, 1),
        ActiMode::None,
    )?;
    let bn = graph.batchnorm(model, &conv)?;
    let t = graph.relu(model, &bn)?;
    let conv = graph.conv2d(model, &t, out_channels, (1, 1), (1, 1), (0, 0), ActiMode::None)?;
    let main = graph.batchnorm(model, &conv)?;

    let shortcut = projection(graph, model, input, out_channels, stride)?;
    let sum = graph.add(model, &main, &shortcut)?;
    graph.relu(model, &sum)
}

/// Identity shortcut, or a strided 1x1 projection when the shape changes
fn projection(
    graph: &mut Graph,
    model: &mut Model,
    input: &Tensor,
    channels: usize,
    stride: usize,
) -> Result<Tensor, GraphError> {
    if stride == 1 && input.dims.channels() == channels {
        return Ok(input.clone());
    }
    let conv = graph.conv2d(
        model,
        input,
        channels,
        (1, 1),
        (stride, stride),
        (0, 0),
        ActiMode::None,
    )?;
    graph.batchnorm(model, &conv)
}
